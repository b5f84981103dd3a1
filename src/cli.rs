//! `clap`-derived CLI flags for the `helics_broker` and `helics_core_node`
//! binaries. Both share the full flag set from spec §6; a broker simply
//! leaves the federate-hosting fields unset.

use clap::Parser;

use crate::config::NodeConfig;

#[derive(Debug, Parser)]
#[command(name = "helics-node", about = "A HELICS core or broker process")]
pub struct Cli {
    /// Path to a JSON or TOML config file, merged under these flags.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    #[arg(long)]
    pub coretype: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub federates: Option<u32>,
    #[arg(long)]
    pub broker: Option<String>,
    #[arg(long)]
    pub broker_address: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub localport: Option<u16>,
    #[arg(long)]
    pub period: Option<f64>,
    #[arg(long)]
    pub offset: Option<f64>,
    #[arg(long)]
    pub time_delta: Option<f64>,
    #[arg(long)]
    pub rtlag: Option<f64>,
    #[arg(long)]
    pub rtlead: Option<f64>,
    #[arg(long)]
    pub rt_tolerance: Option<f64>,
    #[arg(long)]
    pub grant_timeout: Option<f64>,
    #[arg(long)]
    pub maxcosimduration: Option<f64>,
    #[arg(long)]
    pub input_delay: Option<f64>,
    #[arg(long)]
    pub output_delay: Option<f64>,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub flags: Option<Vec<String>>,
    #[arg(long)]
    pub separator: Option<char>,
    #[arg(long)]
    pub autobroker: bool,
    #[arg(long)]
    pub dynamic: bool,
    #[arg(long)]
    pub observer: bool,
    #[arg(long)]
    pub reentrant: bool,
    #[arg(long)]
    pub debugging: bool,
    #[arg(long)]
    pub disable_remote_control: bool,
    #[arg(long)]
    pub external: bool,
    #[arg(long)]
    pub ipv4: bool,
}

impl Cli {
    fn as_config(&self) -> NodeConfig {
        NodeConfig {
            coretype: self.coretype.clone(),
            name: self.name.clone(),
            federates: self.federates,
            broker: self.broker.clone(),
            broker_address: self.broker_address.clone(),
            port: self.port,
            localport: self.localport,
            period: self.period,
            offset: self.offset,
            time_delta: self.time_delta,
            rtlag: self.rtlag,
            rtlead: self.rtlead,
            rt_tolerance: self.rt_tolerance,
            grant_timeout: self.grant_timeout,
            maxcosimduration: self.maxcosimduration,
            input_delay: self.input_delay,
            output_delay: self.output_delay,
            log_level: self.log_level.clone(),
            flags: self.flags.clone(),
            separator: self.separator,
            autobroker: self.autobroker.then_some(true),
            dynamic: self.dynamic.then_some(true),
            observer: self.observer.then_some(true),
            reentrant: self.reentrant.then_some(true),
            debugging: self.debugging.then_some(true),
            disable_remote_control: self.disable_remote_control.then_some(true),
            external: self.external.then_some(true),
            ipv4: self.ipv4.then_some(true),
        }
    }

    /// Resolves the final [`NodeConfig`]: loads `--config` if given, then
    /// overlays every flag this invocation actually set.
    pub fn resolve(&self) -> anyhow::Result<NodeConfig> {
        let base = match &self.config {
            Some(path) => NodeConfig::from_file(path)?,
            None => NodeConfig::default(),
        };
        Ok(base.merge(self.as_config()))
    }
}
