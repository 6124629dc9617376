use clap::{Parser, Subcommand, ValueEnum};
use strata_files::common::types::ResourceKind;

#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspects and loads compressed game asset archives")]
pub struct CliArgs {
    #[arg(long, env = "STRATA_DATA_DIR", default_value_t = default_data_dir())]
    pub data_dir: String,

    #[command(subcommand)]
    pub operation_mode: OperationMode,
}

pub fn default_data_dir() -> String {
    std::env::current_dir()
        .map(|dir| dir.join("_data").to_string_lossy().to_string())
        .unwrap_or_else(|_| "_data".to_owned())
}

#[derive(Subcommand, Debug)]
pub enum OperationMode {
    /// Lists the files of an archive with their type tags and resource indices
    List { archive: String },
    /// Loads a resource and everything it references
    Load {
        archive: String,
        #[arg(value_enum)]
        kind: KindArg,
        index: u32,
    },
    /// Computes the bounds of a terrain
    Bounds { archive: String, index: u32 },
}

#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq)]
pub enum KindArg {
    Terrain,
    Environment,
    Texture,
    Sequence,
}

impl From<KindArg> for ResourceKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Terrain => ResourceKind::TerrainTiles,
            KindArg::Environment => ResourceKind::Environment,
            KindArg::Texture => ResourceKind::Texture,
            KindArg::Sequence => ResourceKind::TextureSequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_load() -> Result<(), anyhow::Error> {
        let args = CliArgs::try_parse_from(["strata", "--data-dir", "/data", "load", "world.sarc", "sequence", "3"])?;
        assert_eq!(args.data_dir, "/data");
        match args.operation_mode {
            OperationMode::Load { archive, kind, index } => {
                assert_eq!(archive, "world.sarc");
                assert_eq!(ResourceKind::from(kind), ResourceKind::TextureSequence);
                assert_eq!(index, 3);
            }
            other => panic!("unexpected mode {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(CliArgs::try_parse_from(["strata", "load", "world.sarc", "mesh", "0"]).is_err());
    }
}
