//! # Registration Runner
//!
//! Runs the pipeline once: load the run record, register it, promote it.
//!
//! This is the only place where failures stop travelling upward. They are
//! logged, printed as `Error: <message>` and reported as
//! [`RunOutcome::Failed`].

use crate::config::RegistrationSettings;
use promoter_core::{ModelRegistry, PromoterError, Promotion, Registrar, load_model_info};
use std::io::Write;

/// How a run ended. Either way the runner has completed.
#[derive(Debug)]
pub enum RunOutcome {
    Promoted(Promotion),
    Failed(PromoterError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Promoted(_))
    }
}

/// Load the record at `settings.info_path`, register it as a new version of
/// `settings.model_name` and move it to the configured stage.
pub fn run<R, W>(settings: &RegistrationSettings, registry: &R, out: &mut W) -> RunOutcome
where
    R: ModelRegistry + ?Sized,
    W: Write,
{
    tracing::info!(
        model = %settings.model_name,
        info_path = %settings.info_path.display(),
        stage = %settings.options.target_stage,
        "Registration pipeline started"
    );

    let registrar = Registrar::with_options(registry, settings.options.clone());
    let result = load_model_info(&settings.info_path)
        .and_then(|info| registrar.register_and_promote(&settings.model_name, &info, out));

    match result {
        Ok(promotion) => {
            tracing::info!(
                model = %promotion.model_name,
                version = %promotion.version.version,
                stage = %promotion.stage,
                "Registration pipeline completed"
            );
            RunOutcome::Promoted(promotion)
        }
        Err(e) => {
            tracing::error!("Registration pipeline failed: {}", e);
            if let Err(write_err) = writeln!(out, "Error: {}", e) {
                tracing::warn!("Cannot print error message: {}", write_err);
            }
            RunOutcome::Failed(e)
        }
    }
}
