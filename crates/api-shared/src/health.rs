use crate::dto::HealthRes;

/// Simple health service shared by the REST server and the CLI.
///
/// This service provides a standardised way to check that the clinic service is up.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static health check; does not touch the store.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Clinic appointments service is alive".into(),
        }
    }
}
