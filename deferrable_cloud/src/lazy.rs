use std::sync::Arc;

use aws_sdk_sqs::Client;
use futures::future::BoxFuture;
use tokio::sync::OnceCell;

/// A thunk that produces an SQS client, invoked at most once, on first use.
///
/// Constructing a [`crate::CloudQueue`] never touches the network; only the
/// first `push`/`pop`/… call resolves this thunk and caches the result.
pub type ClientFactory = Arc<dyn Fn() -> BoxFuture<'static, Client> + Send + Sync>;

/// Returns a [`ClientFactory`] that loads the default AWS configuration
/// chain (environment, profile, IMDS) on first use.
pub fn default_client_factory() -> ClientFactory {
    Arc::new(|| {
        Box::pin(async {
            let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            Client::new(&config)
        })
    })
}

#[derive(Clone)]
pub(crate) struct LazyClient {
    factory: ClientFactory,
    cell: Arc<OnceCell<Client>>,
}

impl LazyClient {
    pub(crate) fn new(factory: ClientFactory) -> Self {
        Self {
            factory,
            cell: Arc::new(OnceCell::new()),
        }
    }

    pub(crate) async fn get(&self) -> &Client {
        self.cell.get_or_init(|| (self.factory)()).await
    }
}
