// SPDX-License-Identifier: MIT

//! Documents read by cloud-init's OpenStack config-drive datasource.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::*;

/// Directory components holding the documents, from the volume root.
pub const CLOUD_INIT_DIRS: [&str; 2] = ["openstack", "latest"];

pub const META_DATA_FILE: &str = "meta_data.json";
pub const NETWORK_DATA_FILE: &str = "network_data.json";
pub const USER_DATA_FILE: &str = "user_data";

/// Empty cloud-config document.
pub const USER_DATA: &str = "#cloud-config\n{}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    pub uuid: Uuid,
    /// Key name to OpenSSH public key.
    pub public_keys: BTreeMap<String, String>,
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub ethernet_mac_address: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub link: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ip_address: String,
    pub netmask: String,
    pub gateway: String,
    #[serde(default)]
    pub dns_nameservers: Vec<String>,
    #[serde(default)]
    pub dns_search: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkData {
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub networks: Vec<Network>,
}

/// Everything written under `/openstack/latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDrivePayload {
    pub meta: MetaData,
    pub network: NetworkData,
    pub user_data: String,
}

impl ConfigDrivePayload {
    /// Builds a payload with a freshly generated instance uuid.
    pub fn new(
        hostname: impl Into<String>,
        public_keys: BTreeMap<String, String>,
        network: NetworkData,
    ) -> Self {
        Self {
            meta: MetaData {
                uuid: new_instance_uuid(),
                public_keys,
                hostname: hostname.into(),
            },
            network,
            user_data: USER_DATA.to_string(),
        }
    }

    pub fn meta_data_json(&self) -> FsResult<Vec<u8>> {
        to_tab_json(&self.meta)
    }

    pub fn network_data_json(&self) -> FsResult<Vec<u8>> {
        to_tab_json(&self.network)
    }

    /// File name and content of every document, in write order.
    pub fn documents(&self) -> FsResult<[(&'static str, Vec<u8>); 3]> {
        Ok([
            (META_DATA_FILE, self.meta_data_json()?),
            (NETWORK_DATA_FILE, self.network_data_json()?),
            (USER_DATA_FILE, self.user_data.as_bytes().to_vec()),
        ])
    }
}

/// Time-based (v1) uuid with a random multicast node id.
pub fn new_instance_uuid() -> Uuid {
    let mut node: [u8; 6] = rand::random();
    node[0] |= 0x01;
    Uuid::now_v1(&node)
}

/// Pretty JSON indented with one tab per level, no trailing newline.
fn to_tab_json<T: Serialize>(value: &T) -> FsResult<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    Ok(out)
}
