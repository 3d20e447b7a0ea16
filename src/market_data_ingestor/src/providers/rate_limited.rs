//! Client-side request throttling for any [`DataProvider`].
//!
//! Vendors enforce per-key quotas (Alpaca's free plan allows 200 requests per
//! minute). Wrapping a provider in [`RateLimitedProvider`] makes every
//! concurrent caller wait on a shared `governor` limiter before the request
//! leaves the process.

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::trace;

use crate::{
    models::{bar_series::BarSeries, request_params::BarsRequestParams},
    providers::{DataProvider, ProviderError},
};

pub struct RateLimitedProvider<P> {
    inner: P,
    limiter: DefaultDirectRateLimiter,
}

impl<P: DataProvider> RateLimitedProvider<P> {
    pub fn new(inner: P, quota: Quota) -> Self {
        Self {
            inner,
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Allows `per_minute` requests per minute with a burst of the same size.
    pub fn per_minute(inner: P, per_minute: NonZeroU32) -> Self {
        Self::new(inner, Quota::per_minute(per_minute))
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: DataProvider> DataProvider for RateLimitedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        self.ready().await;
        self.fetch_admitted(params).await
    }

    async fn ready(&self) {
        self.limiter.until_ready().await;
        self.inner.ready().await;
        trace!(provider = self.inner.name(), "rate limiter admitted request");
    }

    async fn fetch_admitted(
        &self,
        params: BarsRequestParams,
    ) -> Result<Vec<BarSeries>, ProviderError> {
        self.inner.fetch_admitted(params).await
    }
}
