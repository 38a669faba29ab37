//! Channel hosts and config kinds.
//!
//! A website is one `(brand, host)` pair. Every config kind is persisted as
//! one row per client plus one channel entry in a generated config file.

use std::fmt;

use crate::document::ChannelSlot;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Hosts
// ---------------------------------------------------------------------------

/// Hosts a website may be created for directly.
pub const PRIMARY_HOSTS: &[&str] = &["h5", "tth5", "ksh5"];

/// Delivery channel of a brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Host {
    H5,
    Tth5,
    Ksh5,
    /// Mini-program companion of `tth5`.
    Tt,
    /// Mini-program companion of `ksh5`.
    Ks,
}

impl Host {
    /// Parse any known host name.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            "h5" => Ok(Self::H5),
            "tth5" => Ok(Self::Tth5),
            "ksh5" => Ok(Self::Ksh5),
            "tt" => Ok(Self::Tt),
            "ks" => Ok(Self::Ks),
            other => Err(CoreError::Validation(format!(
                "Invalid host '{other}'. Must be one of: {}",
                PRIMARY_HOSTS.join(", ")
            ))),
        }
    }

    /// Parse a host a website may be created for (`h5`, `tth5`, `ksh5`).
    pub fn parse_primary(name: &str) -> Result<Self, CoreError> {
        let host = Self::parse(name)?;
        if host.is_primary() {
            Ok(host)
        } else {
            Err(CoreError::Validation(format!(
                "Invalid host '{name}'. Must be one of: {}",
                PRIMARY_HOSTS.join(", ")
            )))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::H5 => "h5",
            Self::Tth5 => "tth5",
            Self::Ksh5 => "ksh5",
            Self::Tt => "tt",
            Self::Ks => "ks",
        }
    }

    pub fn is_primary(self) -> bool {
        matches!(self, Self::H5 | Self::Tth5 | Self::Ksh5)
    }

    /// The companion host created alongside this one when an extra base
    /// config is supplied.
    pub fn extra_host(self) -> Option<Self> {
        match self {
            Self::Tth5 => Some(Self::Tt),
            Self::Ksh5 => Some(Self::Ks),
            _ => None,
        }
    }

    /// Conditional-compilation macro switched on for this host in the
    /// uni-app build entry.
    pub fn platform_macro(self) -> Option<&'static str> {
        match self {
            Self::H5 => Some("MP-H5"),
            Self::Tth5 => Some("MP-TTH5"),
            Self::Ksh5 => Some("MP-KSH5"),
            _ => None,
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a host name to the uni-app platform it is built with.
pub fn uni_platform(host: &str) -> &'static str {
    match host {
        "tt" => "mp-toutiao",
        "ks" => "mp-kuaishou",
        "wx" => "mp-weixin",
        "bd" => "mp-baidu",
        _ => "h5",
    }
}

/// Build key used in `package.json` and `vite.config.js`: `{host}-{brand}`.
pub fn platform_key(brand: &str, host: &str) -> String {
    format!("{host}-{brand}")
}

// ---------------------------------------------------------------------------
// Config kinds
// ---------------------------------------------------------------------------

/// Config families, each with its own table and generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    Base,
    Common,
    Pay,
    Ui,
    Novel,
}

impl ConfigKind {
    pub const ALL: [ConfigKind; 5] = [
        ConfigKind::Base,
        ConfigKind::Common,
        ConfigKind::Pay,
        ConfigKind::Ui,
        ConfigKind::Novel,
    ];

    /// Kinds stored in one `{brand}.js` file per brand.
    pub const PER_BRAND: [ConfigKind; 4] = [
        ConfigKind::Base,
        ConfigKind::Common,
        ConfigKind::Pay,
        ConfigKind::Ui,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Common => "common",
            Self::Pay => "pay",
            Self::Ui => "ui",
            Self::Novel => "novel",
        }
    }

    /// Entity name used in errors and logs.
    pub fn entity(self) -> &'static str {
        match self {
            Self::Base => "base_config",
            Self::Common => "common_config",
            Self::Pay => "pay_config",
            Self::Ui => "ui_config",
            Self::Novel => "novel_config",
        }
    }

    /// The novel file is shared by all brands and keyed `{brand: {host: …}}`.
    pub fn is_nested(self) -> bool {
        matches!(self, Self::Novel)
    }

    /// Where the channel for `(brand, host)` lives inside this kind's file.
    pub fn slot(self, brand: &str, host: &str) -> ChannelSlot {
        if self.is_nested() {
            ChannelSlot::Nested {
                brand: brand.to_string(),
                host: host.to_string(),
            }
        } else {
            ChannelSlot::Flat {
                host: host.to_string(),
            }
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
