use std::net::Ipv4Addr;

use async_trait::async_trait;
use derive_builder::Builder;
use log::{debug, info, warn};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{AllocationRecord, InventoryError, InventoryGateway};
use crate::spec::VipType;

pub const DEFAULT_METAL_API_URL: &str = "https://api.equinix.com/metal/v1";
pub const METAL_AUTH_TOKEN_ENV_VAR: &str = "METAL_AUTH_TOKEN";
pub const METAL_PROJECT_ID_ENV_VAR: &str = "METAL_PROJECT_ID";
pub const METAL_API_URL_ENV_VAR: &str = "METAL_API_URL";

const USER_AGENT: &str = concat!("constellation/", env!("CARGO_PKG_VERSION"));

/// Address inventory of a single bare-metal project.
#[derive(Debug, Builder)]
#[builder(setter(into))]
pub struct MetalInventory {
    #[builder(default = "DEFAULT_METAL_API_URL.to_owned()")]
    api_url: String,
    auth_token: String,
    project_id: String,
    #[builder(default = "reqwest::Client::new()")]
    client: reqwest::Client,
}

impl MetalInventory {
    fn ips_url(&self) -> String {
        format!(
            "{}/projects/{}/ips",
            self.api_url.trim_end_matches('/'),
            self.project_id
        )
    }

    async fn request_reservation(
        &self,
        request: &IpReservationRequest<'_>,
    ) -> Result<Vec<AllocationRecord>, InventoryError> {
        debug!("{request:#?}");

        let response = self
            .client
            .post(self.ips_url())
            .header("X-Auth-Token", &self.auth_token)
            .header("User-Agent", USER_AGENT)
            .json(request)
            .send()
            .await
            .map_err(InventoryError::Transport)?;

        let reservation: IpReservation = check_status(response)
            .await?
            .json()
            .await
            .map_err(InventoryError::Transport)?;

        match reservation.into_record()? {
            Some(record) => {
                info!(
                    "Reserved {}/{} ({})",
                    record.address, record.cidr, record.vip_type
                );
                Ok(vec![record])
            }
            None => Err(InventoryError::InvalidRecord(
                "the reservation isn't an IPv4 VIP".to_owned(),
            )),
        }
    }
}

#[async_trait]
impl InventoryGateway for MetalInventory {
    async fn list_all_addresses(&self) -> Result<Vec<AllocationRecord>, InventoryError> {
        debug!("Listing reserved addresses of the '{}' project...", self.project_id);

        let response = self
            .client
            .get(self.ips_url())
            .query(&[("types", "public_ipv4,global_ipv4")])
            .header("X-Auth-Token", &self.auth_token)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(InventoryError::Transport)?;

        let list: IpReservationList = check_status(response)
            .await?
            .json()
            .await
            .map_err(InventoryError::Transport)?;

        Ok(records_from_list(list))
    }

    async fn allocate_public(
        &self,
        metro: &str,
        vip_type: VipType,
        count: u32,
        tags: &[String],
    ) -> Result<Vec<AllocationRecord>, InventoryError> {
        self.request_reservation(&IpReservationRequest {
            kind: vip_type.as_str(),
            quantity: count,
            metro: Some(metro),
            tags,
            fail_on_approval_required: true,
        })
        .await
    }

    async fn allocate_global(
        &self,
        count: u32,
        tags: &[String],
    ) -> Result<Vec<AllocationRecord>, InventoryError> {
        self.request_reservation(&IpReservationRequest {
            kind: VipType::GlobalIpv4.as_str(),
            quantity: count,
            metro: None,
            tags,
            fail_on_approval_required: true,
        })
        .await
    }
}

#[derive(Serialize, Debug)]
struct IpReservationRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    metro: Option<&'a str>,
    tags: &'a [String],
    fail_on_approval_required: bool,
}

#[derive(Deserialize, Debug)]
struct IpReservationList {
    #[serde(default)]
    ip_addresses: Vec<IpReservation>,
}

#[derive(Deserialize, Debug)]
struct IpReservation {
    address: Option<String>,
    cidr: Option<u8>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    metro: Option<MetroRef>,
    facility: Option<FacilityRef>,
}

#[derive(Deserialize, Debug)]
struct MetroRef {
    code: Option<String>,
}

#[derive(Deserialize, Debug)]
struct FacilityRef {
    metro: Option<MetroRef>,
}

impl IpReservation {
    /// `None` for reservations that can't back a VIP (private, IPv6, VRF).
    fn into_record(self) -> Result<Option<AllocationRecord>, InventoryError> {
        let vip_type = match self.kind.as_deref().map(str::parse::<VipType>) {
            Some(Ok(vip_type)) => vip_type,
            _ => return Ok(None),
        };

        let raw_address = self
            .address
            .ok_or_else(|| InventoryError::InvalidRecord("missing address".to_owned()))?;
        let address = raw_address
            .parse::<Ipv4Addr>()
            .map_err(|_| InventoryError::InvalidRecord(raw_address.to_owned()))?;

        let metro = self
            .metro
            .and_then(|metro| metro.code)
            .or_else(|| {
                self.facility
                    .and_then(|facility| facility.metro)
                    .and_then(|metro| metro.code)
            })
            .map(|code| code.to_lowercase());

        Ok(Some(AllocationRecord {
            address,
            cidr: self.cidr.unwrap_or(32),
            vip_type,
            tags: self.tags,
            metro,
        }))
    }
}

fn records_from_list(list: IpReservationList) -> Vec<AllocationRecord> {
    list.ip_addresses
        .into_iter()
        .filter_map(|reservation| match reservation.into_record() {
            Ok(record) => record,
            Err(error) => {
                warn!("Skipping an inventory entry: {error}");
                None
            }
        })
        .collect()
}

async fn check_status(response: Response) -> Result<Response, InventoryError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    debug!("Provider responded with {status}: {body}");

    Err(classify_error(status, message))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("errors")
                .and_then(|errors| errors.as_array())
                .map(|errors| {
                    errors
                        .iter()
                        .filter_map(|error| error.as_str())
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .or_else(|| value.get("error").and_then(|e| e.as_str()).map(str::to_owned))
        })
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_owned())
}

fn classify_error(status: StatusCode, message: String) -> InventoryError {
    let lowercase = message.to_lowercase();
    let is_quota = matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::TOO_MANY_REQUESTS
    ) && (lowercase.contains("quota") || lowercase.contains("limit"));

    if is_quota {
        InventoryError::Quota(message)
    } else {
        InventoryError::Provider {
            status: status.as_u16(),
            message,
        }
    }
}
