use std::sync::Arc;
use std::time::Duration;
use log::{debug, info};

use crate::device::constants::DEFAULT_NAME_PREFIX;
use crate::device::transport::Transport;
use crate::device::types::Advertisement;
use crate::device::wand::Wand;
use crate::error::WandError;

/// Selects wands by advertised name prefix or by MAC address. Exactly one must be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WandFilter {
    pub prefix: Option<String>,
    pub mac: Option<String>,
}

impl Default for WandFilter {
    fn default() -> Self {
        WandFilter::prefix(DEFAULT_NAME_PREFIX)
    }
}

enum Criterion<'a> {
    Prefix(&'a str),
    Mac(&'a str),
}

impl WandFilter {
    pub fn prefix<S: Into<String>>(prefix: S) -> Self {
        WandFilter { prefix: Some(prefix.into()), mac: None }
    }

    pub fn mac<S: Into<String>>(mac: S) -> Self {
        WandFilter { prefix: None, mac: Some(mac.into()) }
    }

    fn criterion(&self) -> Result<Criterion<'_>, WandError> {
        match (&self.prefix, &self.mac) {
            (Some(prefix), None) => Ok(Criterion::Prefix(prefix)),
            (None, Some(mac)) => Ok(Criterion::Mac(mac)),
            (None, None) => Err(WandError::configuration(
                "Either a name prefix or a MAC address must be provided to find a wand",
            )),
            (Some(_), Some(_)) => Err(WandError::configuration(
                "Only one of a name prefix or a MAC address may be provided to find a wand",
            )),
        }
    }

    pub fn validate(&self) -> Result<(), WandError> {
        self.criterion().map(|_| ())
    }

    pub fn matches(&self, advertisement: &Advertisement) -> Result<bool, WandError> {
        let matched = match self.criterion()? {
            Criterion::Prefix(prefix) => advertisement.name.as_deref()
                .map(|name| name.starts_with(prefix))
                .unwrap_or(false),
            Criterion::Mac(mac) => advertisement.address.eq_ignore_ascii_case(mac),
        };
        Ok(matched)
    }
}

/// Discovers wands for `timeout` and returns one [`Wand`] per match, connecting each when `connect` is set.
pub async fn scan(transport: Arc<dyn Transport>, filter: &WandFilter, timeout: Duration, connect: bool) -> Result<Vec<Wand>, WandError> {
    filter.validate()?;

    info!("Scanning for {}...", humantime::format_duration(timeout));
    let advertisements = transport.discover(timeout).await
        .map_err(|source| WandError::Discovery { source })?;

    let mut wands = Vec::new();
    for advertisement in advertisements {
        if !filter.matches(&advertisement)? {
            continue;
        }

        debug!("Found wand {} {:?}", advertisement.address, advertisement.name);
        wands.push(Wand::new(advertisement.address, advertisement.name, transport.clone()));
    }

    if connect {
        for wand in &mut wands {
            wand.connect().await?;
        }
    }

    info!("Found {} wand(s)", wands.len());
    Ok(wands)
}
