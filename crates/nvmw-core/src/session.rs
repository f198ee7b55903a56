use std::sync::Arc;

use nvmw_backend::NvmError;
use nvmw_platform::Elevator;
use tokio::sync::OnceCell;

use crate::catalog::{Catalog, fetch_catalog};
use crate::config::Config;
use crate::transfer::Transfer;

/// State shared by the operations of one invocation.
///
/// The release catalog is fetched at most once per session and never
/// persisted.
pub struct Session {
    config: Config,
    transfer: Arc<dyn Transfer>,
    elevator: Arc<dyn Elevator>,
    catalog: OnceCell<Catalog>,
}

impl Session {
    #[must_use]
    pub fn new(config: Config, transfer: Arc<dyn Transfer>, elevator: Arc<dyn Elevator>) -> Self {
        Self {
            config,
            transfer,
            elevator,
            catalog: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn transfer(&self) -> &dyn Transfer {
        self.transfer.as_ref()
    }

    #[must_use]
    pub fn elevator(&self) -> &dyn Elevator {
        self.elevator.as_ref()
    }

    /// The remote release catalog, fetched on first use.
    ///
    /// # Errors
    /// Returns [`NvmError::CatalogUnavailable`] when `index.json` cannot be
    /// retrieved or parsed.
    pub async fn catalog(&self) -> Result<&Catalog, NvmError> {
        self.catalog
            .get_or_try_init(|| fetch_catalog(self.transfer.as_ref(), &self.config.mirrors))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::SAMPLE_INDEX;
    use crate::testing::{MockTransfer, session_with};

    #[tokio::test]
    async fn catalog_is_fetched_once() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let transfer = MockTransfer::new().with_text("https://nodejs.org/dist/index.json", SAMPLE_INDEX);
        let (session, transfer) = session_with(temp.path(), transfer);

        session.catalog().await.expect("catalog should load");
        session.catalog().await.expect("catalog should load again");

        assert_eq!(transfer.request_count("https://nodejs.org/dist/index.json"), 1);
    }
}
