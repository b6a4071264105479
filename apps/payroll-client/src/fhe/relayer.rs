// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP relayer in front of the coprocessor network.
//!
//! - `load` fetches the key URL from `GET /v1/keyurl`
//! - `bootstrap` downloads the gateway public key from that URL
//! - `connect` returns a [`RelayerCoprocessor`] bound to a deployment
//!
//! Encryption goes through `POST /v1/input-proof`; user decryption through
//! `POST /v1/user-decrypt`, whose results come back sealed to the ephemeral
//! public key of the request. HTTP failures are classified into
//! [`CoprocessorError`] here and nowhere else.

use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy::primitives::{hex, Bytes, B256};
use async_trait::async_trait;
use k256::PublicKey;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use super::coprocessor::{
    Coprocessor, CoprocessorError, CoprocessorRuntime, DecryptedValues, EncryptedInput,
    EncryptedInputBuffer, InputValue, UserDecryptRequest,
};
use super::gateway::GatewayConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct RuntimeState {
    key_url: Option<String>,
    gateway_key: Option<PublicKey>,
}

/// Coprocessor runtime reached over the relayer HTTP API.
pub struct RelayerRuntime {
    http: Client,
    relayer_url: String,
    state: Mutex<RuntimeState>,
}

impl RelayerRuntime {
    pub fn new(relayer_url: impl Into<String>) -> Result<Self, CoprocessorError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoprocessorError::Runtime(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            relayer_url: relayer_url.into(),
            state: Mutex::new(RuntimeState::default()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.relayer_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyUrlResponse {
    public_key_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayKeyResponse {
    public_key: String,
}

#[async_trait]
impl CoprocessorRuntime for RelayerRuntime {
    async fn load(&self) -> Result<(), CoprocessorError> {
        let url = self.endpoint("/v1/keyurl");
        let response: KeyUrlResponse = get_json(&self.http, &url).await?;
        debug!(key_url = %response.public_key_url, "Relayer key URL resolved");
        self.state().key_url = Some(response.public_key_url);
        Ok(())
    }

    async fn bootstrap(&self) -> Result<(), CoprocessorError> {
        let key_url = self
            .state()
            .key_url
            .clone()
            .ok_or_else(|| CoprocessorError::Runtime("runtime not loaded".to_string()))?;

        let response: GatewayKeyResponse = get_json(&self.http, &key_url).await?;
        let raw = decode_hex(&response.public_key)?;
        let key = PublicKey::from_sec1_bytes(&raw).map_err(|e| {
            CoprocessorError::MalformedResponse(format!("invalid gateway public key: {e}"))
        })?;

        self.state().gateway_key = Some(key);
        info!("Relayer gateway key loaded");
        Ok(())
    }

    async fn connect(
        &self,
        config: &GatewayConfig,
    ) -> Result<Arc<dyn Coprocessor>, CoprocessorError> {
        let gateway_key = self
            .state()
            .gateway_key
            .clone()
            .ok_or_else(|| CoprocessorError::Runtime("runtime not bootstrapped".to_string()))?;

        Ok(Arc::new(RelayerCoprocessor {
            http: self.http.clone(),
            config: config.clone(),
            gateway_key,
        }))
    }
}

/// Coprocessor session over the relayer.
pub struct RelayerCoprocessor {
    http: Client,
    config: GatewayConfig,
    gateway_key: PublicKey,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputProofRequest {
    contract_address: String,
    user_address: String,
    contract_chain_id: u64,
    values: Vec<InputValueDto>,
}

#[derive(Debug, Serialize)]
struct InputValueDto {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

impl From<&InputValue> for InputValueDto {
    fn from(value: &InputValue) -> Self {
        match value {
            InputValue::Uint128(v) => Self {
                kind: value.type_name(),
                value: v.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputProofResponse {
    handles: Vec<String>,
    input_proof: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDecryptBody {
    handle_contract_pairs: Vec<HandleContractDto>,
    request_validity: RequestValidityDto,
    contracts_chain_id: u64,
    contract_addresses: Vec<String>,
    user_address: String,
    signature: String,
    public_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HandleContractDto {
    handle: String,
    contract_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestValidityDto {
    start_timestamp: String,
    duration_days: String,
}

#[derive(Debug, Deserialize)]
struct UserDecryptResponse {
    response: Vec<SealedValueDto>,
}

#[derive(Debug, Deserialize)]
struct SealedValueDto {
    handle: String,
    sealed: String,
}

impl UserDecryptBody {
    fn from_request(request: &UserDecryptRequest<'_>, chain_id: u64) -> Self {
        Self {
            handle_contract_pairs: request
                .pairs
                .iter()
                .map(|pair| HandleContractDto {
                    handle: pair.handle.to_string(),
                    contract_address: pair.contract.to_checksum(None),
                })
                .collect(),
            request_validity: RequestValidityDto {
                start_timestamp: request.start_timestamp.to_string(),
                duration_days: request.duration_days.to_string(),
            },
            contracts_chain_id: chain_id,
            contract_addresses: request
                .contract_addresses
                .iter()
                .map(|a| a.to_checksum(None))
                .collect(),
            user_address: request.user.to_checksum(None),
            signature: hex::encode_prefixed(request.signature.as_bytes()),
            public_key: request.keypair.public_key_bytes().to_string(),
        }
    }
}

#[async_trait]
impl Coprocessor for RelayerCoprocessor {
    fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn encrypt_input(
        &self,
        buffer: &EncryptedInputBuffer,
    ) -> Result<EncryptedInput, CoprocessorError> {
        let body = InputProofRequest {
            contract_address: buffer.contract().to_checksum(None),
            user_address: buffer.user().to_checksum(None),
            contract_chain_id: self.config.chain_id,
            values: buffer.values().iter().map(InputValueDto::from).collect(),
        };

        let url = self.config.relayer_endpoint("/v1/input-proof");
        let response: InputProofResponse = post_json(&self.http, &url, &body).await?;

        let handles = response
            .handles
            .iter()
            .map(|h| parse_handle(h))
            .collect::<Result<Vec<_>, _>>()?;
        let input_proof = Bytes::from(decode_hex(&response.input_proof)?);

        Ok(EncryptedInput {
            handles,
            input_proof,
        })
    }

    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest<'_>,
    ) -> Result<DecryptedValues, CoprocessorError> {
        let body = UserDecryptBody::from_request(request, self.config.chain_id);
        let url = self.config.relayer_endpoint("/v1/user-decrypt");
        let response: UserDecryptResponse = post_json(&self.http, &url, &body).await?;

        let mut values = DecryptedValues::with_capacity(response.response.len());
        for entry in response.response {
            let handle = parse_handle(&entry.handle)?;
            let sealed = decode_hex(&entry.sealed)?;
            let value = request
                .keypair
                .unseal_u128(&self.gateway_key, handle, &sealed)
                .ok_or_else(|| {
                    CoprocessorError::MalformedResponse(format!(
                        "sealed value for {handle} has {} bytes",
                        sealed.len()
                    ))
                })?;
            values.insert(handle, value);
        }

        Ok(values)
    }
}

async fn get_json<T: DeserializeOwned>(http: &Client, url: &str) -> Result<T, CoprocessorError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| CoprocessorError::Transport(format!("GET {url} failed: {e}")))?;
    read_json(response, url).await
}

async fn post_json<B: Serialize, T: DeserializeOwned>(
    http: &Client,
    url: &str,
    body: &B,
) -> Result<T, CoprocessorError> {
    let response = http
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| CoprocessorError::Transport(format!("POST {url} failed: {e}")))?;
    read_json(response, url).await
}

async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    url: &str,
) -> Result<T, CoprocessorError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify(status, &body));
    }

    response
        .json()
        .await
        .map_err(|e| CoprocessorError::MalformedResponse(format!("{url} invalid JSON: {e}")))
}

#[derive(Debug, Default, Deserialize)]
struct RelayerErrorBody {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map a non-success relayer response to a typed error.
///
/// ACL denials are recognized by label or by whole-word wording and take
/// precedence over the status code, so a 401 that reports a missing grant is
/// still retried.
fn classify(status: StatusCode, body: &str) -> CoprocessorError {
    let parsed: RelayerErrorBody = serde_json::from_str(body).unwrap_or_default();
    let label = parsed.label.unwrap_or_default().to_ascii_lowercase();
    let message = parsed.message.unwrap_or_else(|| body.trim().to_string());

    if label == "invalid_signature" {
        return CoprocessorError::InvalidSignature(message);
    }

    let acl_denied = matches!(label.as_str(), "not_authorized" | "acl")
        || status == StatusCode::FORBIDDEN
        || mentions_acl_denial(&message);

    if acl_denied {
        CoprocessorError::NotAuthorized(message)
    } else if status == StatusCode::UNAUTHORIZED {
        CoprocessorError::InvalidSignature(message)
    } else {
        CoprocessorError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

/// Whole-word match for `acl`, `not authorized` or `permission denied`.
fn mentions_acl_denial(message: &str) -> bool {
    let words: Vec<String> = message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();

    words.iter().any(|w| w == "acl")
        || words
            .windows(2)
            .any(|pair| {
                matches!(
                    (pair[0].as_str(), pair[1].as_str()),
                    ("not", "authorized") | ("permission", "denied")
                )
            })
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, CoprocessorError> {
    hex::decode(raw.trim())
        .map_err(|e| CoprocessorError::MalformedResponse(format!("invalid hex `{raw}`: {e}")))
}

fn parse_handle(raw: &str) -> Result<B256, CoprocessorError> {
    B256::from_str(raw.trim())
        .map_err(|e| CoprocessorError::MalformedResponse(format!("invalid handle `{raw}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::authorization::DecryptionKeypair;
    use crate::fhe::coprocessor::HandleContractPair;
    use alloy::primitives::{Address, Signature, U256};

    #[test]
    fn forbidden_means_acl_not_visible_yet() {
        let err = classify(
            StatusCode::FORBIDDEN,
            r#"{"label":"not_authorized","message":"user is not allowed"}"#,
        );
        assert!(err.is_transient());
    }

    #[test]
    fn acl_wording_in_body_is_transient_regardless_of_status() {
        let err = classify(StatusCode::BAD_REQUEST, "handle is not authorized by ACL");
        assert!(matches!(err, CoprocessorError::NotAuthorized(_)));
    }

    #[test]
    fn invalid_signature_is_fatal() {
        let err = classify(
            StatusCode::BAD_REQUEST,
            r#"{"label":"invalid_signature","message":"signature mismatch"}"#,
        );
        assert_eq!(
            err,
            CoprocessorError::InvalidSignature("signature mismatch".into())
        );
        assert!(!err.is_transient());

        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, ""),
            CoprocessorError::InvalidSignature(_)
        ));
    }

    #[test]
    fn acl_must_be_a_whole_word() {
        let err = classify(StatusCode::INTERNAL_SERVER_ERROR, "decryption oracle unavailable");
        assert!(!err.is_transient());
        assert!(matches!(err, CoprocessorError::Rejected { status: 500, .. }));

        assert!(!classify(StatusCode::BAD_REQUEST, "miracle").is_transient());
        assert!(classify(StatusCode::BAD_REQUEST, "ACL: handle not granted").is_transient());
    }

    #[test]
    fn unauthorized_with_acl_wording_is_transient() {
        let err = classify(StatusCode::UNAUTHORIZED, "user is not authorized for handle");
        assert!(matches!(err, CoprocessorError::NotAuthorized(_)));

        let err = classify(StatusCode::UNAUTHORIZED, "bad credentials");
        assert!(matches!(err, CoprocessorError::InvalidSignature(_)));
    }

    #[test]
    fn other_failures_are_rejections() {
        let err = classify(StatusCode::INTERNAL_SERVER_ERROR, "upstream timeout");
        assert_eq!(
            err,
            CoprocessorError::Rejected {
                status: 500,
                message: "upstream timeout".into()
            }
        );
    }

    #[test]
    fn input_values_serialize_as_decimal_strings() {
        let value = InputValueDto::from(&InputValue::Uint128(u128::MAX));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "euint128");
        assert_eq!(json["value"], u128::MAX.to_string());
    }

    #[test]
    fn user_decrypt_body_carries_key_and_validity() {
        let keypair = DecryptionKeypair::generate();
        let contract = Address::repeat_byte(0xc0);
        let request = UserDecryptRequest {
            pairs: vec![HandleContractPair {
                handle: B256::repeat_byte(1),
                contract,
            }],
            keypair: &keypair,
            signature: Signature::new(U256::from(1u8), U256::from(2u8), false),
            contract_addresses: vec![contract],
            user: Address::repeat_byte(0x01),
            start_timestamp: 1_700_000_000,
            duration_days: 10,
        };

        let json =
            serde_json::to_value(UserDecryptBody::from_request(&request, 11_155_111)).unwrap();

        assert_eq!(json["requestValidity"]["durationDays"], "10");
        assert_eq!(json["requestValidity"]["startTimestamp"], "1700000000");
        assert_eq!(json["publicKey"], keypair.public_key_bytes().to_string());
        assert_eq!(json["handleContractPairs"].as_array().unwrap().len(), 1);
        assert_eq!(json["contractsChainId"], 11_155_111);
    }

    #[test]
    fn handles_parse_from_prefixed_hex() {
        let raw = format!("0x{}", "ab".repeat(32));
        assert_eq!(parse_handle(&raw).unwrap(), B256::repeat_byte(0xab));
        assert!(parse_handle("0x1234").is_err());
    }

    #[tokio::test]
    async fn connect_requires_bootstrap() {
        let runtime = RelayerRuntime::new("http://127.0.0.1:1").unwrap();
        let err = runtime.connect(&GatewayConfig::sepolia()).await.err().unwrap();
        assert!(matches!(err, CoprocessorError::Runtime(_)));
    }
}
