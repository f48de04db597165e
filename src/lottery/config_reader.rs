use crate::args::Args;
use crate::lottery::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SharesConfig {
    pub student: f64,
    pub staff: f64,
    pub external: f64,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputsConfig {
    pub admitted: Option<String>,
    pub waitlisted: Option<String>,
    #[serde(rename = "consolidatedAdmitted")]
    pub consolidated_admitted: Option<String>,
    #[serde(rename = "consolidatedWaitlisted")]
    pub consolidated_waitlisted: Option<String>,
    pub summary: Option<String>,
}

/// The settings of a lottery, as written in a configuration file.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct LotteryConfig {
    pub input: Option<String>,
    #[serde(rename = "inputType")]
    pub input_type: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    pub slots: Option<u32>,
    pub shares: Option<SharesConfig>,
    pub seed: Option<u64>,
    #[serde(rename = "perGroup")]
    pub per_group: Option<bool>,
    #[serde(rename = "groupSlots")]
    pub group_slots: Option<BTreeMap<String, u32>>,
    pub outputs: Option<OutputsConfig>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Csv,
    Excel,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct OutputPaths {
    pub admitted: Option<String>,
    pub waitlisted: Option<String>,
    pub consolidated_admitted: Option<String>,
    pub consolidated_waitlisted: Option<String>,
    pub summary: Option<String>,
}

/// The validated settings of a draw, after merging the configuration file and the command line.
#[derive(PartialEq, Debug, Clone)]
pub struct Settings {
    pub input: String,
    pub input_type: InputType,
    pub excel_worksheet_name: Option<String>,
    pub slots: Option<u32>,
    pub shares: Shares,
    pub seed: u64,
    pub per_group: bool,
    pub group_slots: Option<BTreeMap<String, u32>>,
    pub outputs: OutputPaths,
    pub reference: Option<String>,
}

pub fn read_config(path: &str) -> DrawResult<LotteryConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let mut config: LotteryConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);

    // Paths in the configuration are relative to the configuration file.
    let root = Path::new(path).parent().unwrap_or_else(|| Path::new(""));
    let resolve = |p: &mut Option<String>| {
        if let Some(x) = p.as_mut() {
            if x != "stdout" && Path::new(x.as_str()).is_relative() {
                *x = root.join(x.as_str()).display().to_string();
            }
        }
    };
    resolve(&mut config.input);
    if let Some(outputs) = config.outputs.as_mut() {
        resolve(&mut outputs.admitted);
        resolve(&mut outputs.waitlisted);
        resolve(&mut outputs.consolidated_admitted);
        resolve(&mut outputs.consolidated_waitlisted);
        resolve(&mut outputs.summary);
    }
    Ok(config)
}

/// Merges the command line and the (optional) configuration file.
pub fn build_settings(args: &Args) -> DrawResult<Settings> {
    let config = match args.config.as_deref() {
        Some(p) => {
            info!("Reading configuration {:?}", p);
            read_config(p)?
        }
        None => LotteryConfig::default(),
    };
    merge_settings(args, config)
}

pub fn merge_settings(args: &Args, config: LotteryConfig) -> DrawResult<Settings> {
    let input = args
        .input
        .clone()
        .or(config.input)
        .context(ConfigSnafu {
            message: "missing input file (--input)",
        })?;

    let type_name = args.input_type.clone().or(config.input_type);
    let input_type = read_input_type(type_name.as_deref(), &input)?;

    let shares_c = config.shares;
    let pct = |arg: Option<f64>, from_config: Option<f64>, flag: &str| {
        arg.or(from_config).context(ConfigSnafu {
            message: format!("missing percentage (--{})", flag),
        })
    };
    let student = pct(
        args.pct_student,
        shares_c.as_ref().map(|s| s.student),
        "pct-student",
    )?;
    let staff = pct(
        args.pct_staff,
        shares_c.as_ref().map(|s| s.staff),
        "pct-staff",
    )?;
    let external = pct(
        args.pct_external,
        shares_c.as_ref().map(|s| s.external),
        "pct-external",
    )?;

    let seed = args.seed.or(config.seed).context(ConfigSnafu {
        message: "missing seed (--seed)",
    })?;

    let per_group = args.per_group || config.per_group.unwrap_or(false);
    let slots = args.slots.or(config.slots);
    if !per_group && slots.is_none() {
        return ConfigSnafu {
            message: "missing number of slots (--slots), required unless --per-group is used",
        }
        .fail();
    }

    let group_slots = match args.group_slots.as_deref() {
        Some(text) if !text.trim().is_empty() => Some(parse_group_slots(text)?),
        _ => config.group_slots,
    };

    let outputs_c = config.outputs.unwrap_or_default();
    let outputs = OutputPaths {
        admitted: args.out_admitted.clone().or(outputs_c.admitted),
        waitlisted: args.out_waitlisted.clone().or(outputs_c.waitlisted),
        consolidated_admitted: args
            .out_consolidated_admitted
            .clone()
            .or(outputs_c.consolidated_admitted),
        consolidated_waitlisted: args
            .out_consolidated_waitlisted
            .clone()
            .or(outputs_c.consolidated_waitlisted),
        summary: args.summary.clone().or(outputs_c.summary),
    };

    Ok(Settings {
        input,
        input_type,
        excel_worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or(config.excel_worksheet_name),
        slots,
        shares: Shares::new(student, staff, external),
        seed,
        per_group,
        group_slots,
        outputs,
        reference: args.reference.clone(),
    })
}

fn read_input_type(name: Option<&str>, input: &str) -> DrawResult<InputType> {
    match name {
        Some("csv") => Ok(InputType::Csv),
        Some("xlsx") | Some("excel") => Ok(InputType::Excel),
        Some(x) => ConfigSnafu {
            message: format!("unknown input type {:?}, expected csv or xlsx", x),
        }
        .fail(),
        None => {
            let ext = Path::new(input)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase());
            match ext.as_deref() {
                Some("xlsx") | Some("xlsm") => Ok(InputType::Excel),
                _ => Ok(InputType::Csv),
            }
        }
    }
}

pub fn read_summary(path: &str) -> DrawResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_summary: {:?}", contents);
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

/// Parses the slots per group: `GROUP=NUM;GROUP2=NUM2`.
pub fn parse_group_slots(text: &str) -> DrawResult<BTreeMap<String, u32>> {
    let mut res: BTreeMap<String, u32> = BTreeMap::new();
    for part in text.split(';') {
        if part.trim().is_empty() {
            continue;
        }
        let (group, num) = part.split_once('=').context(ConfigSnafu {
            message: format!("expected GROUP=NUM in the group slots, got {:?}", part),
        })?;
        let count = num.trim().parse::<i64>().ok().context(ConfigSnafu {
            message: format!(
                "invalid number of slots {:?} for group {:?}",
                num.trim(),
                group.trim()
            ),
        })?;
        // A non-positive count leaves the group without slots.
        if count <= 0 {
            warn!(
                "parse_group_slots: group {:?} has {} slots, nobody will be admitted",
                group.trim(),
                count
            );
        }
        let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
        res.insert(group.trim().to_string(), count);
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            input: Some("candidates.csv".to_string()),
            pct_student: Some(0.5),
            pct_staff: Some(0.3),
            pct_external: Some(0.2),
            seed: Some(42),
            slots: Some(7),
            ..Args::default()
        }
    }

    #[test]
    fn group_slots_parsing() {
        let res = parse_group_slots("A=3; Turma B = 2;;").unwrap();
        assert_eq!(res.get("A"), Some(&3));
        assert_eq!(res.get("Turma B"), Some(&2));
        assert_eq!(res.len(), 2);
    }

    #[test]
    fn group_slots_parsing_errors() {
        assert!(matches!(
            parse_group_slots("A=3;B"),
            Err(DrawError::Config { .. })
        ));
        assert!(matches!(
            parse_group_slots("A=three"),
            Err(DrawError::Config { .. })
        ));
    }

    #[test]
    fn group_slots_non_positive_counts() {
        let res = parse_group_slots("A=-1;B=0;C=2").unwrap();
        assert_eq!(res.get("A"), Some(&0));
        assert_eq!(res.get("B"), Some(&0));
        assert_eq!(res.get("C"), Some(&2));
    }

    #[test]
    fn settings_from_args() {
        let s = merge_settings(&base_args(), LotteryConfig::default()).unwrap();
        assert_eq!(s.input_type, InputType::Csv);
        assert_eq!(s.slots, Some(7));
        assert_eq!(s.shares, Shares::new(0.5, 0.3, 0.2));
        assert!(!s.per_group);
    }

    #[test]
    fn settings_require_slots_for_single_draw() {
        let args = Args {
            slots: None,
            ..base_args()
        };
        assert!(matches!(
            merge_settings(&args, LotteryConfig::default()),
            Err(DrawError::Config { .. })
        ));
        let args = Args {
            slots: None,
            per_group: true,
            ..base_args()
        };
        assert!(merge_settings(&args, LotteryConfig::default()).is_ok());
    }

    #[test]
    fn settings_args_override_config() {
        let config: LotteryConfig = serde_json::from_str(
            r#"{
                "input": "from_config.xlsx",
                "slots": 10,
                "shares": {"student": 1.0, "staff": 0.0, "external": 0.0},
                "seed": 1,
                "perGroup": true,
                "groupSlots": {"A": 4},
                "outputs": {"admitted": "out/a.csv"}
            }"#,
        )
        .unwrap();
        let args = Args {
            seed: Some(99),
            ..Args::default()
        };
        let s = merge_settings(&args, config).unwrap();
        assert_eq!(s.input, "from_config.xlsx");
        assert_eq!(s.input_type, InputType::Excel);
        assert_eq!(s.seed, 99);
        assert_eq!(s.shares, Shares::new(1.0, 0.0, 0.0));
        assert!(s.per_group);
        assert_eq!(s.group_slots.unwrap().get("A"), Some(&4));
        assert_eq!(s.outputs.admitted.as_deref(), Some("out/a.csv"));
    }

    #[test]
    fn settings_missing_percentage() {
        let args = Args {
            pct_staff: None,
            ..base_args()
        };
        match merge_settings(&args, LotteryConfig::default()) {
            Err(DrawError::Config { message }) => assert!(message.contains("pct-staff")),
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn unknown_input_type() {
        let args = Args {
            input_type: Some("ods".to_string()),
            ..base_args()
        };
        assert!(merge_settings(&args, LotteryConfig::default()).is_err());
    }

    #[test]
    fn config_paths_are_relative_to_the_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lottery.json");
        fs::write(
            &path,
            r#"{"input": "c.csv", "outputs": {"summary": "stdout", "admitted": "out/a.csv"}}"#,
        )
        .unwrap();
        let config = read_config(path.to_str().unwrap()).unwrap();
        assert_eq!(
            config.input,
            Some(dir.path().join("c.csv").display().to_string())
        );
        let outputs = config.outputs.unwrap();
        assert_eq!(outputs.summary.as_deref(), Some("stdout"));
        assert_eq!(
            outputs.admitted,
            Some(dir.path().join("out/a.csv").display().to_string())
        );
    }

    #[test]
    fn config_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lottery.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_config(path.to_str().unwrap()),
            Err(DrawError::ParsingJson { .. })
        ));
    }
}
