//! `set-cookie` attribute rewrite.

use async_trait::async_trait;

use crate::config::SetCookieConfig;
use crate::headers::{cookie::UnknownSameSite, SameSite};
use crate::processing::{MutationBuilder, Processor, ProcessorResult, TransactionContext};

/// Rewrites the `SameSite` (and optionally `HttpOnly`) attribute of every
/// cookie the upstream sets.
///
/// The first rewritten cookie overwrites the `set-cookie` header and the
/// others are appended, so the response carries exactly the rewritten set.
#[derive(Debug, Clone)]
pub struct SetCookieProcessor {
    same_site: SameSite,
    force_http_only: bool,
}

impl SetCookieProcessor {
    pub fn new(same_site: SameSite) -> Self {
        Self {
            same_site,
            force_http_only: false,
        }
    }

    pub fn force_http_only(mut self, force: bool) -> Self {
        self.force_http_only = force;
        self
    }

    pub fn from_config(config: &SetCookieConfig) -> Result<Self, UnknownSameSite> {
        Ok(Self::new(config.same_site.parse()?).force_http_only(config.force_http_only))
    }
}

impl Default for SetCookieProcessor {
    fn default() -> Self {
        Self::new(SameSite::Strict)
    }
}

#[async_trait]
impl Processor for SetCookieProcessor {
    fn name(&self) -> &str {
        "set_cookie"
    }

    async fn response_headers(
        &self,
        ctx: &mut TransactionContext,
        mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        for (i, cookie) in ctx.set_cookies().iter().enumerate() {
            let mut cookie = cookie.clone();
            cookie.same_site = Some(self.same_site);
            cookie.http_only |= self.force_http_only;

            let line = cookie.to_string();
            tracing::debug!(cookie = %cookie.name, "Rewriting set-cookie");
            if i == 0 {
                mutation.set_header("set-cookie", &line);
            } else {
                mutation.append_header("set-cookie", &line);
            }
        }
        Ok(None)
    }
}
