use crate::mixpanel::AnalyticsClient;
use crate::protocol::HealthResponse;

pub const RUNNING: &str = "Server is running";

/// Reports liveness and whether the vendor client holds a token.
pub fn health(client: &dyn AnalyticsClient) -> HealthResponse {
    HealthResponse {
        status: RUNNING,
        mixpanel_token: match client.is_configured() {
            true => "Configurado",
            false => "No configurado",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::RecordingClient;

    #[test]
    fn test_health_reports_token_state() {
        let response = health(&RecordingClient::new());
        assert_eq!(response.status, "Server is running");
        assert_eq!(response.mixpanel_token, "Configurado");

        let response = health(&RecordingClient::unconfigured());
        assert_eq!(response.mixpanel_token, "No configurado");
    }
}
