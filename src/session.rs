use std::{fmt, time::Duration};

use reqwest::Url;
use tokio::{runtime::Handle, time::sleep};

use crate::{ClientOptions, KvsError, Result};

const SERVICE_NAME: &str = "kvs";
const SERVICE_VERSION: &str = "v1.0.0";

/// Address used by [`KvsClient::from_env`] when `KVS_SERVICE_URL` is unset.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";

// Lets in-flight TLS teardown finish before the caller reopens.
const CLOSE_GRACE: Duration = Duration::from_millis(250);

/// Resolves the service root: `<base>/kvs/v1-0-0`.
pub fn service_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|err| KvsError::Config(format!("invalid base url '{base_url}': {err}")))?;
    url.path_segments_mut()
        .map_err(|_| KvsError::Config(format!("base url '{base_url}' cannot have a path")))?
        .pop_if_empty()
        .push(SERVICE_NAME)
        .push(&SERVICE_VERSION.replace('.', "-"));
    Ok(url)
}

/// Connection settings for the KVS service.
///
/// A `KvsClient` holds no network resources; it opens [`Session`]s, each
/// owning its own connection pool.
#[derive(Clone, Debug)]
pub struct KvsClient {
    base_url: Url,
    options: ClientOptions,
}

impl KvsClient {
    /// Creates a client for the service running at `base_url`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use kvs_client::KvsClient;
    ///
    /// let kvs = KvsClient::new("http://localhost:8080").expect("valid url");
    /// ```
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            base_url: service_url(base_url.as_ref())?,
            options: ClientOptions::default(),
        })
    }

    /// Creates a client from the `KVS_SERVICE_URL` environment variable,
    /// falling back to [`DEFAULT_SERVICE_URL`].
    pub fn from_env() -> Result<Self> {
        match std::env::var("KVS_SERVICE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::new(DEFAULT_SERVICE_URL),
        }
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Service root every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Opens a new session with its own connection pool.
    ///
    /// Fails with [`KvsError::Config`] when called outside a Tokio runtime:
    /// sessions only live inside the asynchronous execution model.
    pub fn open(&self) -> Result<Session> {
        Session::open(self.base_url.clone(), self.options.clone())
    }

    /// Runs `f` with a fresh session and closes it afterwards.
    ///
    /// If `f` panics or the returned future is dropped, the session's
    /// connection pool is still released when the session is dropped.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use kvs_client::{Int, KvsClient, Session};
    ///
    /// # async fn run() -> kvs_client::Result<()> {
    /// let kvs = KvsClient::from_env()?;
    /// let value = kvs
    ///     .scope(async |session: &Session| session.get::<Int>("counter").await)
    ///     .await??;
    /// println!("{value}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scope<T, F>(&self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&Session) -> T,
    {
        let mut session = self.open()?;
        let output = f(&session).await;
        session.close().await;
        Ok(output)
    }
}

/// Scoped handle owning one HTTP connection pool.
///
/// Operations borrow the session immutably, so any number of them may run
/// concurrently. [`Session::close`] needs exclusive access and can therefore
/// only run once every in-flight call has settled.
pub struct Session {
    http: Option<reqwest::Client>,
    base_url: Url,
    options: ClientOptions,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("open", &self.is_open())
            .field("options", &self.options)
            .finish()
    }
}

impl Session {
    pub(crate) fn open(base_url: Url, options: ClientOptions) -> Result<Self> {
        Handle::try_current().map_err(|_| {
            KvsError::Config(
                "sessions must be opened inside an async runtime; use KvsClient::scope".to_owned(),
            )
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(options.timeout_ms))
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(|err| KvsError::Config(format!("failed to build http client: {err}")))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(base_url = %base_url, "kvs session opened");

        Ok(Self {
            http: Some(http),
            base_url,
            options,
        })
    }

    pub fn is_open(&self) -> bool {
        self.http.is_some()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Releases the connection pool.
    ///
    /// Later operations fail with [`KvsError::InvalidState`]. Closing an
    /// already closed session is a no-op.
    pub async fn close(&mut self) {
        if self.http.take().is_none() {
            return;
        }
        sleep(CLOSE_GRACE).await;

        #[cfg(feature = "tracing")]
        tracing::debug!(base_url = %self.base_url, "kvs session closed");
    }

    pub(crate) fn http(&self) -> Result<&reqwest::Client> {
        self.http
            .as_ref()
            .ok_or_else(|| KvsError::InvalidState("session is closed".to_owned()))
    }

    /// Resolves `<base>/<segment>/...`, percent-encoding every segment.
    pub(crate) fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> Url {
        let mut url = self.base_url.clone();
        // The base was validated as hierarchical in `service_url`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        #[cfg(feature = "tracing")]
        {
            if self.http.is_some() {
                tracing::debug!(base_url = %self.base_url, "kvs session dropped without close");
            }
        }
    }
}
