// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read-or-create operations.

use stratum_tier::{CacheItem, CacheKey, Error, Result};

use crate::{
    CacheManager,
    manager::validate,
    telemetry::{CacheActivity, CacheOperation},
};

/// How a get-or-add loop ended.
#[derive(Debug)]
enum Resolution<V> {
    Found(CacheItem<V>),
    Added(CacheItem<V>),
    NothingProduced,
    Exhausted { attempts: u32 },
}

impl<V> Resolution<V> {
    fn activity(&self) -> CacheActivity {
        match self {
            Self::Found(_) => CacheActivity::Hit,
            Self::Added(_) => CacheActivity::Added,
            Self::NothingProduced => CacheActivity::Miss,
            Self::Exhausted { .. } => CacheActivity::Exhausted,
        }
    }
}

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Gets an item, or adds the item produced by `factory` if no tier holds the key.
    ///
    /// The factory runs at most once per call, and only on a miss. If another
    /// writer adds the key between the read and the add, the loop reads again
    /// and returns the winner's item; the produced item is reused for every
    /// further add attempt. At most `max_retries + 1` attempts are made.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument) for a
    ///   blank key, or when the produced item has a different key.
    /// - [`ErrorKind::InvalidState`](crate::ErrorKind::InvalidState) when the
    ///   factory produced nothing, or when the key could not be read nor added
    ///   within the retry budget.
    /// - The error of a failing tier.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum::{CacheItem, CacheManager};
    /// use tick::Clock;
    ///
    /// # futures::executor::block_on(async {
    /// let cache = CacheManager::<String>::builder(Clock::new_frozen()).memory().build()?;
    ///
    /// let item = cache
    ///     .get_or_add("x", |key| async move { Some(CacheItem::new(key, "created".to_owned())) })
    ///     .await?;
    /// assert_eq!(item.value(), "created");
    /// # Ok::<(), stratum::Error>(())
    /// # });
    /// ```
    pub async fn get_or_add<F, Fut>(&self, key: impl Into<CacheKey>, factory: F) -> Result<CacheItem<V>>
    where
        F: FnOnce(CacheKey) -> Fut + Send,
        Fut: Future<Output = Option<CacheItem<V>>> + Send,
    {
        let key = validate(key.into())?;
        match self.resolve(&key, factory).await? {
            Resolution::Found(item) | Resolution::Added(item) => Ok(item),
            Resolution::NothingProduced => Err(Error::invalid_state(format!(
                "get or add of '{key}' failed: the item to add must not be empty"
            ))),
            Resolution::Exhausted { attempts } => Err(Error::invalid_state(format!(
                "could not get nor add the item '{key}' within {attempts} attempts"
            ))),
        }
    }

    /// Like [`get_or_add`](Self::get_or_add), with a factory producing only the value.
    ///
    /// # Errors
    ///
    /// See [`get_or_add`](Self::get_or_add).
    pub async fn get_or_add_value<F, Fut>(&self, key: impl Into<CacheKey>, factory: F) -> Result<V>
    where
        F: FnOnce(CacheKey) -> Fut + Send,
        Fut: Future<Output = Option<V>> + Send,
    {
        let item = self
            .get_or_add(key, move |key: CacheKey| {
                let produced = factory(key.clone());
                async move { produced.await.map(|value| CacheItem::new(key, value)) }
            })
            .await?;
        Ok(item.into_value())
    }

    /// Like [`get_or_add`](Self::get_or_add), but returns `None` instead of
    /// failing when the factory produced nothing or the retry budget ran out.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank or mismatched key, or the error of a failing tier.
    pub async fn try_get_or_add<F, Fut>(&self, key: impl Into<CacheKey>, factory: F) -> Result<Option<CacheItem<V>>>
    where
        F: FnOnce(CacheKey) -> Fut + Send,
        Fut: Future<Output = Option<CacheItem<V>>> + Send,
    {
        let key = validate(key.into())?;
        Ok(match self.resolve(&key, factory).await? {
            Resolution::Found(item) | Resolution::Added(item) => Some(item),
            Resolution::NothingProduced | Resolution::Exhausted { .. } => None,
        })
    }

    /// Like [`try_get_or_add`](Self::try_get_or_add), with a factory producing only the value.
    ///
    /// # Errors
    ///
    /// See [`try_get_or_add`](Self::try_get_or_add).
    pub async fn try_get_or_add_value<F, Fut>(&self, key: impl Into<CacheKey>, factory: F) -> Result<Option<V>>
    where
        F: FnOnce(CacheKey) -> Fut + Send,
        Fut: Future<Output = Option<V>> + Send,
    {
        let item = self
            .try_get_or_add(key, move |key: CacheKey| {
                let produced = factory(key.clone());
                async move { produced.await.map(|value| CacheItem::new(key, value)) }
            })
            .await?;
        Ok(item.map(CacheItem::into_value))
    }

    async fn resolve<F, Fut>(&self, key: &CacheKey, factory: F) -> Result<Resolution<V>>
    where
        F: FnOnce(CacheKey) -> Fut + Send,
        Fut: Future<Output = Option<CacheItem<V>>> + Send,
    {
        let work = async {
            let attempts = self.options().max_retries().saturating_add(1);
            let mut factory = Some(factory);
            let mut produced: Option<CacheItem<V>> = None;

            for _ in 0..attempts {
                if let Some(item) = self.get_item(key).await? {
                    return Ok(Resolution::Found(item));
                }

                if produced.is_none()
                    && let Some(factory) = factory.take()
                {
                    produced = factory(key.clone()).await;
                    if let Some(item) = &produced
                        && item.key() != key
                    {
                        return Err(Error::invalid_argument(format!(
                            "factory for '{key}' produced an item for '{}'",
                            item.key()
                        )));
                    }
                }

                let Some(item) = &produced else {
                    return Ok(Resolution::NothingProduced);
                };

                if self.add_item(item).await? {
                    return Ok(Resolution::Added(item.clone()));
                }
            }

            Ok(Resolution::Exhausted { attempts })
        };

        self.observe(CacheOperation::GetOrAdd, work, Resolution::activity).await
    }
}
