//! # Shipment Field Enums

//! This module defines the enumerated fields of a shipment record: its lifecycle status, the destination facility and the container size.
//! Each enum knows the exact cell text it is written as, and accepts the older spellings still found in archived sheets when read back.

use std::str::FromStr;
use serde::{Deserialize, Serialize};
use derive_more::Display;
use crate::errors::TrackerError;

/// The lifecycle status of a shipment record in the active store.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    /// The container is registered and still being loaded or in shipment.
    #[display("pending")]
    Pending,
    /// The container has shipped and is waiting for the daily cutover.
    #[display("completed")]
    Completed,
}

impl ShipmentStatus {
    /// The opposite status, used by the status toggle.
    pub fn toggled(self) -> Self {
        match self {
            ShipmentStatus::Pending => ShipmentStatus::Completed,
            ShipmentStatus::Completed => ShipmentStatus::Pending,
        }
    }
}

impl FromStr for ShipmentStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" | "Pending" | "선적중" => Ok(ShipmentStatus::Pending),
            "completed" | "Completed" | "선적완료" => Ok(ShipmentStatus::Completed),
            other => Err(TrackerError::InvalidField { field: "status", value: other.to_string() }),
        }
    }
}

/// The fixed set of facilities a container can be shipped to.
///
/// The sheet stores the facility's Korean name; the romanized variant name is accepted on input as well.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, Default, Serialize, Deserialize)]
pub enum Destination {
    #[default]
    Vietnam,
    BacNinh,
    Hatack,
    Weihai,
    Zhongwon,
    Yeongseong,
    VietnamElectric,
    HungYen,
    Beijing,
    Rakreung,
    Other,
}

impl Destination {
    /// Every destination, in the order the registration form offers them.
    pub const ALL: [Destination; 11] = [
        Destination::Vietnam,
        Destination::BacNinh,
        Destination::Hatack,
        Destination::Weihai,
        Destination::Zhongwon,
        Destination::Yeongseong,
        Destination::VietnamElectric,
        Destination::HungYen,
        Destination::Beijing,
        Destination::Rakreung,
        Destination::Other,
    ];

    /// The facility name as written in the sheet.
    pub fn label(self) -> &'static str {
        match self {
            Destination::Vietnam => "베트남",
            Destination::BacNinh => "박닌",
            Destination::Hatack => "하택",
            Destination::Weihai => "위해",
            Destination::Zhongwon => "중원",
            Destination::Yeongseong => "영성",
            Destination::VietnamElectric => "베트남전장",
            Destination::HungYen => "흥옌",
            Destination::Beijing => "북경",
            Destination::Rakreung => "락릉",
            Destination::Other => "기타",
        }
    }

    fn variant_name(self) -> &'static str {
        match self {
            Destination::Vietnam => "Vietnam",
            Destination::BacNinh => "BacNinh",
            Destination::Hatack => "Hatack",
            Destination::Weihai => "Weihai",
            Destination::Zhongwon => "Zhongwon",
            Destination::Yeongseong => "Yeongseong",
            Destination::VietnamElectric => "VietnamElectric",
            Destination::HungYen => "HungYen",
            Destination::Beijing => "Beijing",
            Destination::Rakreung => "Rakreung",
            Destination::Other => "Other",
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Destination {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Destination::ALL
            .into_iter()
            .find(|d| d.label() == s || d.variant_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TrackerError::InvalidField { field: "destination", value: s.to_string() })
    }
}

/// Container length in feet.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, Default, Serialize, Deserialize, Display)]
pub enum ContainerSize {
    #[display("20")]
    Twenty,
    #[default]
    #[display("40")]
    Forty,
}

impl ContainerSize {
    pub fn feet(self) -> u8 {
        match self {
            ContainerSize::Twenty => 20,
            ContainerSize::Forty => 40,
        }
    }
}

impl FromStr for ContainerSize {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // sheets that auto-typed the column hand back "40.0"
        match s.trim().trim_end_matches(".0") {
            "20" => Ok(ContainerSize::Twenty),
            "40" => Ok(ContainerSize::Forty),
            other => Err(TrackerError::InvalidField { field: "size_feet", value: other.to_string() }),
        }
    }
}
