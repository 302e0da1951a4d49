//! Cloud adapter that drives the `aws` command-line client.
//!
//! The vendor SDK stays out of process: the control loop only ever sees
//! the four `CloudApi` operations. Credentials are injected into the child
//! environment per call and never logged.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::api::{
    CloudApi, CloudError, Credentials, RequestSpotInstances, RunInstances, SpotPrice,
};

pub struct AwsCliCloud {
    bin: String,
}

impl AwsCliCloud {
    pub fn new() -> Self {
        Self { bin: "aws".into() }
    }

    async fn ec2(
        &self,
        creds: &Credentials,
        args: &[String],
    ) -> Result<serde_json::Value, CloudError> {
        debug!(operation = %args[0], "invoking cloud client");
        let output = Command::new(&self.bin)
            .arg("ec2")
            .args(args)
            .arg("--output")
            .arg("json")
            .env("AWS_ACCESS_KEY_ID", &creds.access_key)
            .env("AWS_SECRET_ACCESS_KEY", &creds.secret_key)
            .output()
            .await
            .map_err(|e| CloudError::Client(format!("failed to spawn {}: {e}", self.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify(&stderr));
        }
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| CloudError::Rejected(format!("unparseable cloud response: {e}")))
    }
}

impl Default for AwsCliCloud {
    fn default() -> Self {
        Self::new()
    }
}

/// Throttles and availability failures are transient; anything else is the
/// cloud rejecting the request itself.
fn classify(stderr: &str) -> CloudError {
    const TRANSIENT: [&str; 5] = [
        "RequestLimitExceeded",
        "Throttling",
        "ServiceUnavailable",
        "InternalError",
        "timed out",
    ];
    if TRANSIENT.iter().any(|marker| stderr.contains(marker)) {
        CloudError::Server(stderr.to_string())
    } else {
        CloudError::Rejected(stderr.to_string())
    }
}

fn decode<T: for<'de> Deserialize<'de>>(value: serde_json::Value) -> Result<T, CloudError> {
    serde_json::from_value(value)
        .map_err(|e| CloudError::Rejected(format!("unexpected cloud response shape: {e}")))
}

#[derive(Deserialize)]
struct RunInstancesResponse {
    #[serde(rename = "Instances", default)]
    instances: Vec<LaunchedInstance>,
}

#[derive(Deserialize)]
struct LaunchedInstance {
    #[serde(rename = "InstanceId")]
    instance_id: String,
}

#[derive(Deserialize)]
struct SpotRequestResponse {
    #[serde(rename = "SpotInstanceRequests", default)]
    requests: Vec<SpotRequest>,
}

#[derive(Deserialize)]
struct SpotRequest {
    #[serde(rename = "SpotInstanceRequestId")]
    request_id: String,
}

#[derive(Deserialize)]
struct SpotHistoryResponse {
    #[serde(rename = "SpotPriceHistory", default)]
    history: Vec<SpotHistoryEntry>,
}

#[derive(Deserialize)]
struct SpotHistoryEntry {
    #[serde(rename = "InstanceType")]
    sku: String,
    #[serde(rename = "AvailabilityZone")]
    zone: String,
    #[serde(rename = "SpotPrice")]
    price: String,
}

#[async_trait]
impl CloudApi for AwsCliCloud {
    async fn run_instances(
        &self,
        creds: &Credentials,
        params: RunInstances,
    ) -> Result<Vec<String>, CloudError> {
        let devices = serde_json::to_string(&params.block_devices)
            .map_err(|e| CloudError::Rejected(format!("bad block device mapping: {e}")))?;

        let args = vec![
            "run-instances".to_string(),
            "--count".into(),
            params.count.to_string(),
            "--instance-type".into(),
            params.sku,
            "--image-id".into(),
            params.ami,
            "--key-name".into(),
            params.key_pair,
            "--security-group-ids".into(),
            params.security_group,
            "--subnet-id".into(),
            params.subnet,
            "--user-data".into(),
            params.user_data,
            "--block-device-mappings".into(),
            devices,
        ];
        let response: RunInstancesResponse = decode(self.ec2(creds, &args).await?)?;
        Ok(response
            .instances
            .into_iter()
            .map(|i| i.instance_id)
            .collect())
    }

    async fn request_spot_instances(
        &self,
        creds: &Credentials,
        params: RequestSpotInstances,
    ) -> Result<Vec<String>, CloudError> {
        // The launch specification carries the user data base64-encoded.
        let spec = serde_json::json!({
            "ImageId": params.ami,
            "KeyName": params.key_pair,
            "SecurityGroupIds": [params.security_group],
            "InstanceType": params.sku,
            "SubnetId": params.subnet,
            "UserData": BASE64.encode(params.user_data.as_bytes()),
            "BlockDeviceMappings": params.block_devices,
        });

        let args = vec![
            "request-spot-instances".to_string(),
            "--spot-price".into(),
            format!("{:.4}", params.bid),
            "--instance-count".into(),
            params.count.to_string(),
            "--launch-specification".into(),
            spec.to_string(),
        ];
        let response: SpotRequestResponse = decode(self.ec2(creds, &args).await?)?;
        Ok(response.requests.into_iter().map(|r| r.request_id).collect())
    }

    async fn create_tags(
        &self,
        creds: &Credentials,
        ids: &[String],
        tags: &[(String, String)],
    ) -> Result<(), CloudError> {
        let mut args = vec!["create-tags".to_string(), "--resources".into()];
        args.extend(ids.iter().cloned());
        args.push("--tags".into());
        for (key, value) in tags {
            args.push(format!("Key={key},Value={value}"));
        }
        self.ec2(creds, &args).await.map(|_| ())
    }

    async fn spot_price_history(
        &self,
        creds: &Credentials,
        sku: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SpotPrice>, CloudError> {
        let args = vec![
            "describe-spot-price-history".to_string(),
            "--instance-types".into(),
            sku.to_string(),
            "--product-descriptions".into(),
            "Linux/UNIX".into(),
            "--start-time".into(),
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "--end-time".into(),
            end.to_rfc3339_opts(SecondsFormat::Secs, true),
        ];
        let response: SpotHistoryResponse = decode(self.ec2(creds, &args).await?)?;
        Ok(response
            .history
            .into_iter()
            .filter_map(|entry| {
                entry.price.parse::<f64>().ok().map(|price| SpotPrice {
                    sku: entry.sku,
                    zone: entry.zone,
                    price,
                })
            })
            .collect())
    }
}
