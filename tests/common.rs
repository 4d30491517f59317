#![allow(dead_code)]

use fcm_dispatch::adapters::credentials::StaticToken;
use fcm_dispatch::{ConnectionParams, Endpoints, FcmClient, telemetry};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const SERVER_KEY: &str = "AAAA-test-server-key";
pub const SENDER_ID: &str = "123456789";
pub const PROJECT_ID: &str = "demo-project";
pub const ACCESS_TOKEN: &str = "ya29.test-access-token";

pub fn setup_tracing() {
    telemetry::init_test_telemetry();
}

/// A mock FCM, IID and group-management backend on a random local port.
pub struct TestFcm {
    pub server: MockServer,
}

impl TestFcm {
    pub async fn spawn() -> Self {
        setup_tracing();
        Self { server: MockServer::start().await }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::with_base(&self.server.uri())
    }

    pub fn legacy_client(&self) -> FcmClient {
        let params = ConnectionParams::Legacy { server_key: SERVER_KEY.into(), sender_id: SENDER_ID.into() };
        FcmClient::new(params, Duration::from_secs(5)).unwrap().with_endpoints(self.endpoints())
    }

    pub fn v1_client(&self) -> FcmClient {
        let credentials = Arc::new(StaticToken::new(PROJECT_ID, ACCESS_TOKEN));
        FcmClient::new(ConnectionParams::V1 { credentials }, Duration::from_secs(5))
            .unwrap()
            .with_endpoints(self.endpoints())
    }

    pub fn v1_send_path() -> String {
        format!("/v1/projects/{PROJECT_ID}/messages:send")
    }
}
