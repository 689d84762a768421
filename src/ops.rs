use reqwest::{Method, Url};

use crate::{
    codec::{self, Int, Storage},
    executor::RawResponse,
    MapValue, OpResult, Params, Result, Session, Value,
};

/// Response header signalling that a delete actually removed a key.
/// Header names are matched case-insensitively.
pub const DELETED_HEADER: &str = "deleted";

impl Session {
    /// Calls the `echo` procedure; the service returns `input` unchanged.
    pub async fn echo(&self, input: impl Into<String>) -> Result<OpResult<String>> {
        let input = input.into();
        let url = self.endpoint(&["echo"]);
        let params = Params::arg(input.as_str());
        self.call(Method::POST, url, Some(input), params, |response| {
            codec::decode_text(&response.body)
        })
        .await
    }

    /// Calls the `hello` procedure. Used to check connectivity.
    pub async fn hello(&self) -> Result<OpResult<String>> {
        let url = self.endpoint(&["hello"]);
        self.call(Method::POST, url, None, Params::none(), |response| {
            codec::decode_text(&response.body)
        })
        .await
    }

    /// Calls the `fibo` procedure, computing the `n`-th Fibonacci number.
    ///
    /// Large indices take long on the service side; see
    /// [`Batch::with_deadline`](crate::Batch::with_deadline) to bound them.
    pub async fn fibo(&self, n: u32) -> Result<OpResult<u64>> {
        let mut url = self.endpoint(&["fibo"]);
        url.query_pairs_mut().append_pair("n", &n.to_string());
        self.call(Method::POST, url, None, Params::arg(n), |response| {
            codec::parse_text(&response.body, "fibonacci")
        })
        .await
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub async fn put<S: Storage>(
        &self,
        key: impl Into<String>,
        value: S::Value,
    ) -> Result<OpResult<()>> {
        let key = key.into();
        let body = S::encode(&value)?;
        let url = self.storage_endpoint::<S>("put", &key);
        let params = Params::key_value(key, value);
        self.call(Method::PUT, url, Some(body), params, |_| Ok(())).await
    }

    /// Reads the value under `key`. A missing key yields a failed result
    /// with status 404.
    pub async fn get<S: Storage>(&self, key: impl Into<String>) -> Result<OpResult<S::Value>> {
        let key = key.into();
        let url = self.storage_endpoint::<S>("get", &key);
        self.call(Method::GET, url, None, Params::key(key), |response| {
            S::decode(&response.body)
        })
        .await
    }

    /// Deletes `key`. The value is `true` only when the service reports
    /// the key as removed through the [`DELETED_HEADER`] marker.
    pub async fn delete<S: Storage>(&self, key: impl Into<String>) -> Result<OpResult<bool>> {
        let key = key.into();
        let url = self.storage_endpoint::<S>("del", &key);
        self.call(Method::DELETE, url, None, Params::key(key), |response| {
            Ok(response.has_header(DELETED_HEADER))
        })
        .await
    }

    /// Increments the integer under `key` by one.
    ///
    /// Returns the value held before the increment; a missing key counts
    /// as `0` and is created by the service.
    pub async fn incr(&self, key: impl Into<String>) -> Result<OpResult<i32>> {
        let key = key.into();
        let url = self.storage_endpoint::<Int>("incr", &key);
        self.call(Method::PUT, url, None, Params::key(key), |response| {
            Int::decode(&response.body)
        })
        .await
    }

    /// Increments the integer under `key` by `by`, which may be negative.
    ///
    /// Returns the value held before the increment, like [`Session::incr`].
    pub async fn incr_by(&self, key: impl Into<String>, by: i32) -> Result<OpResult<i32>> {
        let key = key.into();
        let body = Int::encode(&by)?;
        let url = self.storage_endpoint::<Int>("incrby", &key);
        self.call(Method::PUT, url, Some(body), Params::key_value(key, by), |response| {
            Int::decode(&response.body)
        })
        .await
    }

    /// Stores a map built from loosely typed entries.
    ///
    /// Entries whose key has no plain-text form are silently dropped, see
    /// [`codec::map_from_entries`].
    pub async fn map_put_entries<I, K>(
        &self,
        key: impl Into<String>,
        entries: I,
    ) -> Result<OpResult<()>>
    where
        I: IntoIterator<Item = (K, String)>,
        K: Into<Value>,
    {
        let (map, _dropped) = codec::map_from_entries(entries);
        self.put::<codec::Map>(key, map).await
    }

    fn storage_endpoint<S: Storage>(&self, verb: &str, key: &str) -> Url {
        let mut segments = S::operation(verb);
        segments.push(key.to_owned());
        self.endpoint(segments.as_slice())
    }

    async fn call<T>(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
        params: Params,
        decode: impl FnOnce(&RawResponse) -> std::result::Result<T, String>,
    ) -> Result<OpResult<T>> {
        #[cfg(feature = "tracing")]
        tracing::info!(%method, endpoint = %url, params = %params, "kvs request");

        let response = self.execute(method, url, body, None).await?;
        Ok(settle(response, params, decode))
    }
}

fn settle<T>(
    response: RawResponse,
    params: Params,
    decode: impl FnOnce(&RawResponse) -> std::result::Result<T, String>,
) -> OpResult<T> {
    if !response.is_success() {
        let message = response.error_message();
        return OpResult::failure(response.status, response.endpoint, params, message);
    }
    match decode(&response) {
        Ok(value) => OpResult::success(response.status, response.endpoint, params, value),
        Err(message) => OpResult::failure(response.status, response.endpoint, params, message),
    }
}

/// Map of a parsed `key=value` list, as accepted by the map storage.
pub fn map_from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> MapValue {
    pairs
        .into_iter()
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}
