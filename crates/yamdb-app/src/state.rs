use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use yamdb_auth::{
    mail::{MailTemplate, Mailer},
    token::TokenManager,
};
use yamdb_dal::Pool;
use yamdb_types::{config::ReviewsConfig, general::YearRange};

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(
        app_config: AppConfig,
        pool: Pool,
        tokens: TokenManager,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let mail_template = MailTemplate::from(&app_config.reviews);
        AppState {
            state: Arc::new(AppStateInner {
                pool,
                tokens,
                mailer,
                mail_template,
                app_config,
            }),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.state.mailer.as_ref()
    }

    pub fn mail_template(&self) -> &MailTemplate {
        &self.state.mail_template
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    /// Years accepted for titles, up to the current year
    pub fn year_range(&self) -> YearRange {
        YearRange {
            min: self.config().reviews.min_year,
            max: OffsetDateTime::now_utc().year(),
        }
    }
}

struct AppStateInner {
    pool: Pool,
    tokens: TokenManager,
    mailer: Arc<dyn Mailer>,
    mail_template: MailTemplate,
    app_config: AppConfig,
}

pub struct AppConfig {
    pub default_page_size: u32,
    pub reviews: ReviewsConfig,
}

// Validation contexts

impl FromRef<AppState> for () {
    fn from_ref(_input: &AppState) -> Self {}
}

impl FromRef<AppState> for YearRange {
    fn from_ref(input: &AppState) -> Self {
        input.year_range()
    }
}
