//! Node configuration: every flag in spec §6, accepted from the CLI, a
//! JSON/TOML config file, or both (CLI wins on conflict).

use serde::{Deserialize, Serialize};

/// The full set of configurable node properties. Every field is optional
/// so a config file may specify a subset and let the CLI (or defaults)
/// fill in the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    pub coretype: Option<String>,
    pub name: Option<String>,
    pub federates: Option<u32>,
    pub broker: Option<String>,
    pub broker_address: Option<String>,
    pub port: Option<u16>,
    pub localport: Option<u16>,
    pub period: Option<f64>,
    pub offset: Option<f64>,
    pub time_delta: Option<f64>,
    pub rtlag: Option<f64>,
    pub rtlead: Option<f64>,
    pub rt_tolerance: Option<f64>,
    pub grant_timeout: Option<f64>,
    pub maxcosimduration: Option<f64>,
    pub input_delay: Option<f64>,
    pub output_delay: Option<f64>,
    pub log_level: Option<String>,
    pub flags: Option<Vec<String>>,
    pub separator: Option<char>,
    pub autobroker: Option<bool>,
    pub dynamic: Option<bool>,
    pub observer: Option<bool>,
    pub reentrant: Option<bool>,
    pub debugging: Option<bool>,
    pub disable_remote_control: Option<bool>,
    pub external: Option<bool>,
    pub ipv4: Option<bool>,
}

impl NodeConfig {
    /// Loads a config file, dispatching on its extension (`.json` vs
    /// `.toml`; anything else is rejected as an unrecognized format).
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&text)?),
            Some("toml") => Ok(toml::from_str(&text)?),
            other => anyhow::bail!("unrecognized config file extension: {other:?}"),
        }
    }

    /// Overlays `cli` on top of `self` (a file-loaded config): every field
    /// `cli` sets wins, everything else falls back to `self`.
    pub fn merge(self, cli: NodeConfig) -> NodeConfig {
        NodeConfig {
            coretype: cli.coretype.or(self.coretype),
            name: cli.name.or(self.name),
            federates: cli.federates.or(self.federates),
            broker: cli.broker.or(self.broker),
            broker_address: cli.broker_address.or(self.broker_address),
            port: cli.port.or(self.port),
            localport: cli.localport.or(self.localport),
            period: cli.period.or(self.period),
            offset: cli.offset.or(self.offset),
            time_delta: cli.time_delta.or(self.time_delta),
            rtlag: cli.rtlag.or(self.rtlag),
            rtlead: cli.rtlead.or(self.rtlead),
            rt_tolerance: cli.rt_tolerance.or(self.rt_tolerance),
            grant_timeout: cli.grant_timeout.or(self.grant_timeout),
            maxcosimduration: cli.maxcosimduration.or(self.maxcosimduration),
            input_delay: cli.input_delay.or(self.input_delay),
            output_delay: cli.output_delay.or(self.output_delay),
            log_level: cli.log_level.or(self.log_level),
            flags: cli.flags.or(self.flags),
            separator: cli.separator.or(self.separator),
            autobroker: cli.autobroker.or(self.autobroker),
            dynamic: cli.dynamic.or(self.dynamic),
            observer: cli.observer.or(self.observer),
            reentrant: cli.reentrant.or(self.reentrant),
            debugging: cli.debugging.or(self.debugging),
            disable_remote_control: cli.disable_remote_control.or(self.disable_remote_control),
            external: cli.external.or(self.external),
            ipv4: cli.ipv4.or(self.ipv4),
        }
    }
}
