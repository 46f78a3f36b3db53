#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{
    Clock, MessageService, PresenceTable, RelayEngine, RelayEngineDependencies, SessionValidator,
    SystemClock, UserService, UserServiceDependencies,
};
use infrastructure::{BcryptPasswordHasher, Infrastructure};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::{net::TcpListener, net::TcpStream, sync::oneshot};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Error as WsError},
    MaybeTlsStream, WebSocketStream,
};
use web_api::{router, AppState};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 使用内存存储的测试服务器，drop 时关闭
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub presence: Arc<PresenceTable>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub struct LoggedIn {
    pub id: i64,
    pub token: String,
}

pub async fn spawn_server() -> TestServer {
    let config = config::AppConfig::default();
    let infra = Infrastructure::in_memory(Arc::new(BcryptPasswordHasher::new(Some(4))));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let presence = Arc::new(PresenceTable::new());

    let user_service = UserService::new(UserServiceDependencies {
        user_repository: infra.user_repository.clone(),
        session_repository: infra.session_repository.clone(),
        password_hasher: infra.password_hasher.clone(),
        clock: clock.clone(),
        presence: presence.clone(),
        session_ttl: chrono::Duration::hours(config.session.ttl_hours),
    });
    let message_service = MessageService::new(infra.message_repository.clone());
    let relay = RelayEngine::new(
        RelayEngineDependencies {
            validator: SessionValidator::new(infra.session_repository.clone(), clock),
            message_repository: infra.message_repository.clone(),
            presence: presence.clone(),
        },
        &config.relay,
    );

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(message_service),
        Arc::new(relay),
    );
    let app = router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    TestServer {
        addr,
        client: Client::new(),
        presence,
        shutdown: Some(shutdown_tx),
    }
}

impl TestServer {
    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub async fn register(&self, username: &str) -> reqwest::Response {
        self.client
            .post(self.http("/api/v1/users/register"))
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "1234"
            }))
            .send()
            .await
            .expect("register request")
    }

    pub async fn login(&self, username: &str) -> reqwest::Response {
        self.client
            .post(self.http("/api/v1/users/login"))
            .json(&json!({
                "email": format!("{username}@example.com"),
                "password": "1234"
            }))
            .send()
            .await
            .expect("login request")
    }

    /// 注册并登录，返回用户 ID 和令牌
    pub async fn signup(&self, username: &str) -> LoggedIn {
        let registered: Value = self.register(username).await.json().await.expect("json");
        let login: Value = self.login(username).await.json().await.expect("json");
        LoggedIn {
            id: registered["id"].as_i64().expect("id"),
            token: login["token"].as_str().expect("token").to_string(),
        }
    }

    /// 以 cookie 携带令牌连接实时通道
    pub async fn connect(&self, user_id: i64, token: Option<&str>) -> Result<WsClient, WsError> {
        let mut request = self
            .ws(&format!("/api/v1/messages/{user_id}"))
            .into_client_request()?;
        if let Some(token) = token {
            request.headers_mut().insert(
                "cookie",
                HeaderValue::from_str(&format!("token={token}")).expect("header"),
            );
        }
        connect_async(request).await.map(|(stream, _)| stream)
    }

    /// 等待在线状态收敛（连接关闭后清理是异步的）
    pub async fn wait_until_online(&self, user_id: i64, online: bool) {
        let user = domain::UserId::new(user_id);
        for _ in 0..100 {
            if self.presence.is_online(user) == online {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("user {user_id} online state never became {online}");
    }
}
