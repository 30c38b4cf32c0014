use std::{fmt, str::FromStr};

use crate::WocError;

/// Blockchain namespace served by the API.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Chain {
    #[default]
    Bsv,
    Btc,
}

impl Chain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bsv => "bsv",
            Self::Btc => "btc",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = WocError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bsv" => Ok(Self::Bsv),
            "btc" => Ok(Self::Btc),
            _ => Err(WocError::InvalidChain(value.to_owned())),
        }
    }
}

/// Network under a chain.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Network {
    #[default]
    Main,
    Test,
    /// Scaling test network, BSV only.
    Stn,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
            Self::Stn => "stn",
        }
    }

    /// Whether this network exists under `chain`.
    pub fn is_available_on(self, chain: Chain) -> bool {
        !(self == Self::Stn && chain == Chain::Btc)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = WocError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(Self::Main),
            "test" => Ok(Self::Test),
            "stn" => Ok(Self::Stn),
            _ => Err(WocError::InvalidNetwork(value.to_owned())),
        }
    }
}

pub(crate) fn ensure_network_available(chain: Chain, network: Network) -> Result<(), WocError> {
    if network.is_available_on(chain) {
        Ok(())
    } else {
        Err(WocError::UnsupportedNetwork { chain, network })
    }
}

/// Diagnostic snapshot of the most recent HTTP exchange.
///
/// `status_code` is `0` when no response was received.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LastRequest {
    pub method: String,
    pub url: String,
    pub post_data: String,
    pub status_code: u16,
}
