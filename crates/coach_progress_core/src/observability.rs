use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct Health {
    pub ready: bool,
    pub service: &'static str,
    pub version: &'static str,
}

impl Health {
    pub fn readiness() -> Self {
        Self {
            ready: true,
            service: "coach-progress",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
