use application::{PasswordHasher, PasswordHasherError};
use async_trait::async_trait;
use bcrypt::DEFAULT_COST;
use domain::PasswordHash;

/// bcrypt 哈希，计算放到阻塞线程池中执行
#[derive(Debug, Clone)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: Option<u32>) -> Self {
        Self {
            cost: cost.unwrap_or(DEFAULT_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(None)
    }
}

async fn run_blocking<T, F>(
    job: F,
    into_err: fn(String) -> PasswordHasherError,
) -> Result<T, PasswordHasherError>
where
    F: FnOnce() -> Result<T, bcrypt::BcryptError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result.map_err(|err| into_err(err.to_string())),
        Err(join_err) => Err(into_err(join_err.to_string())),
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();
        let hashed = run_blocking(move || bcrypt::hash(plaintext, cost), PasswordHasherError::Hash)
            .await?;
        PasswordHash::new(hashed).map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        let plaintext = plaintext.to_owned();
        let hashed = hashed.as_str().to_owned();
        run_blocking(
            move || bcrypt::verify(plaintext, &hashed),
            PasswordHasherError::Verify,
        )
        .await
    }
}
