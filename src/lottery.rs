use log::{debug, info, warn};

use quota_lottery::*;
use snafu::{prelude::*, Snafu};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::lottery::config_reader::*;
use crate::lottery::io_common::parse_int_maybe;
use crate::lottery::io_output::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
mod io_output;

#[derive(Debug, Snafu)]
pub enum DrawError {
    #[snafu(display("Error opening CSV file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name:?} not found in {path}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("No header found in {path}"))]
    EmptyInput { path: String },
    #[snafu(display("Invalid input {path}: {message}"))]
    Schema { path: String, message: String },
    #[snafu(display("Invalid settings: {message}"))]
    Config { message: String },
    #[snafu(display("The lottery could not run"))]
    Lottery { source: LotteryErrors },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error writing CSV file {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error creating directory {path}"))]
    CreatingDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between the summary and the reference summary {path}"))]
    ReferenceMismatch { path: String },
}

pub type DrawResult<T> = Result<T, DrawError>;

const GROUP_SLOTS_COLUMN: &str = "Quantidade vagas [Vaga]";

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct SummaryConfig {
    input: String,
    seed: u64,
    shares: SharesConfig,
    #[serde(rename = "perGroup")]
    per_group: bool,
}

/// Runs the lottery described by the command line (and the configuration file, if any).
pub fn run(args: &Args) -> DrawResult<()> {
    let settings = build_settings(args)?;
    info!("settings: {:?}", settings);
    run_draw(&settings)
}

pub fn run_draw(settings: &Settings) -> DrawResult<()> {
    let candidates = read_candidates(settings)?;
    info!(
        "Read {} candidates from {:?}",
        candidates.len(),
        settings.input
    );

    let results: Vec<JSValue> = if settings.per_group {
        run_grouped(settings, &candidates)?
    } else {
        run_single(settings, &candidates)?
    };

    let result_js = build_summary_js(settings, results);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(WritingJsonSnafu)?;
    match settings.outputs.summary.as_deref() {
        Some("stdout") => println!("{}", pretty_js_stats),
        Some(p) if !p.is_empty() => write_text(p, &pretty_js_stats)?,
        _ => {}
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = settings.reference.as_deref() {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu)?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu { path: summary_p }.fail();
        }
        info!("The outcome matches the reference {:?}", summary_p);
    }
    Ok(())
}

fn read_candidates(settings: &Settings) -> DrawResult<Vec<Candidate>> {
    let path = settings.input.as_str();
    let table = match settings.input_type {
        InputType::Csv => io_csv::read_csv_table(path)?,
        InputType::Excel => {
            io_excel::read_excel_table(path, settings.excel_worksheet_name.as_deref())?
        }
    };
    io_common::table_to_candidates(path, &table)
}

fn run_single(settings: &Settings, candidates: &[Candidate]) -> DrawResult<Vec<JSValue>> {
    let slots = settings.slots.context(ConfigSnafu {
        message: "missing number of slots (--slots)",
    })?;
    if settings.outputs.consolidated_admitted.is_some()
        || settings.outputs.consolidated_waitlisted.is_some()
    {
        warn!("The consolidated outputs are only written with --per-group, ignoring them");
    }
    let outcome =
        run_lottery(candidates, slots, &settings.shares, settings.seed).context(LotterySnafu)?;

    print_lists(&outcome);

    let project_all =
        |l: &[&Candidate]| -> Vec<[String; 5]> { l.iter().map(|c| project(c, "")).collect() };
    if let Some(p) = settings.outputs.admitted.as_deref() {
        write_candidates(p, &project_all(&outcome.admitted))?;
    }
    if let Some(p) = settings.outputs.waitlisted.as_deref() {
        write_candidates(p, &project_all(&outcome.waitlisted))?;
    }

    Ok(vec![pool_to_json("", slots, settings.seed, &outcome)])
}

fn run_grouped(settings: &Settings, candidates: &[Candidate]) -> DrawResult<Vec<JSValue>> {
    let group_slots =
        resolve_group_slots(candidates, settings.group_slots.as_ref(), settings.slots);
    debug!("run_grouped: group slots: {:?}", group_slots);
    let outcomes = run_lottery_per_group(candidates, &group_slots, &settings.shares, settings.seed)
        .context(LotterySnafu)?;

    for go in outcomes.iter() {
        println!("\n=== Group: {} ===", go.group);
        print_lists(&go.outcome);

        let project_all = |l: &[&Candidate]| -> Vec<[String; 5]> {
            l.iter().map(|c| project(c, &go.group)).collect()
        };
        if let Some(base) = settings.outputs.admitted.as_deref() {
            let p = group_output_path(base, &go.group, "aprovados");
            write_candidates(&p, &project_all(&go.outcome.admitted))?;
        }
        if let Some(base) = settings.outputs.waitlisted.as_deref() {
            let p = group_output_path(base, &go.group, "espera");
            write_candidates(&p, &project_all(&go.outcome.waitlisted))?;
        }
    }

    // The consolidated files list the groups by name.
    let mut sorted: Vec<&GroupOutcome> = outcomes.iter().collect();
    sorted.sort_by(|a, b| a.group.cmp(&b.group));
    if let Some(p) = settings.outputs.consolidated_admitted.as_deref() {
        let records: Vec<[String; 5]> = sorted
            .iter()
            .flat_map(|go| go.outcome.admitted.iter().map(move |c| project(c, &go.group)))
            .collect();
        write_candidates(p, &records)?;
    }
    if let Some(p) = settings.outputs.consolidated_waitlisted.as_deref() {
        let records: Vec<[String; 5]> = sorted
            .iter()
            .flat_map(|go| go.outcome.waitlisted.iter().map(move |c| project(c, &go.group)))
            .collect();
        write_candidates(p, &records)?;
    }

    Ok(outcomes
        .iter()
        .map(|go| pool_to_json(&go.group, go.slots, go.seed, &go.outcome))
        .collect())
}

/// The slots of each group.
///
/// Explicit group slots win. Otherwise the first readable value of the
/// column `Quantidade vagas [Vaga]` of each group is used. The default, when
/// given, applies to all the groups that are still undefined.
pub fn resolve_group_slots(
    candidates: &[Candidate],
    explicit: Option<&BTreeMap<String, u32>>,
    default_slots: Option<u32>,
) -> HashMap<String, u32> {
    let mut res: HashMap<String, u32> = HashMap::new();
    match explicit {
        Some(m) => {
            res.extend(m.iter().map(|(k, v)| (k.clone(), *v)));
        }
        None => {
            for c in candidates.iter() {
                let group = c.group_name();
                if group.is_empty() || res.contains_key(group) {
                    continue;
                }
                if let Some(n) = c.field(GROUP_SLOTS_COLUMN).and_then(parse_int_maybe) {
                    res.insert(group.to_string(), n);
                }
            }
        }
    }
    if let Some(n) = default_slots {
        for c in candidates.iter() {
            res.entry(c.group_name().to_string()).or_insert(n);
        }
    }
    res
}

fn print_lists(outcome: &LotteryOutcome) {
    let fmt = |c: &Candidate| format!(" -  {} - {} ({})", c.id, c.name, c.category);
    println!("Admitted:");
    for c in outcome.admitted.iter() {
        println!("{}", fmt(c));
    }
    println!("Waitlist:");
    for c in outcome.waitlisted.iter() {
        println!("{}", fmt(c));
    }
}

fn pool_to_json(group: &str, slots: u32, seed: u64, outcome: &LotteryOutcome) -> JSValue {
    let mut quotas: JSMap<String, JSValue> = JSMap::new();
    for (cat, q) in outcome.quotas.iter() {
        quotas.insert(cat.label().to_string(), json!(q));
    }
    let ids = |l: &[&Candidate]| -> Vec<String> { l.iter().map(|c| c.id.clone()).collect() };
    json!({
        "group": group,
        "slots": slots,
        "seed": seed,
        "quotas": quotas,
        "admitted": ids(&outcome.admitted),
        "waitlisted": ids(&outcome.waitlisted),
    })
}

fn build_summary_js(settings: &Settings, results: Vec<JSValue>) -> JSValue {
    let c = SummaryConfig {
        input: io_common::simplify_file_name(&settings.input),
        seed: settings.seed,
        shares: SharesConfig {
            student: settings.shares.get(Category::Student),
            staff: settings.shares.get(Category::Staff),
            external: settings.shares.get(Category::ExternalCommunity),
        },
        per_group: settings.per_group,
    };
    json!({
        "config": c,
        "results": results })
}

fn write_text(path: &str, contents: &str) -> DrawResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(CreatingDirSnafu {
                path: parent.display().to_string(),
            })?;
        }
    }
    fs::write(path, contents).context(WritingFileSnafu { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &tempfile::TempDir, input: &str) -> Settings {
        Settings {
            input: dir.path().join(input).display().to_string(),
            input_type: InputType::Csv,
            excel_worksheet_name: None,
            slots: Some(3),
            shares: Shares::new(0.5, 0.3, 0.2),
            seed: 42,
            per_group: false,
            group_slots: None,
            outputs: OutputPaths::default(),
            reference: None,
        }
    }

    fn out(dir: &tempfile::TempDir, name: &str) -> String {
        dir.path().join(name).display().to_string()
    }

    fn data_lines(path: &str) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(|s| s.to_string())
            .collect()
    }

    const SIMPLE: &str = "id,nome,categoria\n\
        1,Ana,Aluno\n\
        2,Bruno,Aluno\n\
        3,Carla,Servidor\n\
        4,Davi,Comunidade Externa\n\
        5,Eva,Aluno\n";

    const REGISTRATION: &str = "Id [Candidato],Numero,Nome [Candidato],Turma [Vaga],Quantidade vagas [Vaga],Aluno [Candidato],Servidor [Candidato],Externo [Candidato],Aluno [Vaga],Servidor [Vaga],Externo [Vaga]\n\
        a1,101,Ana,Turma B,2,true,false,false,true,true,false\n\
        a2,102,Bruno,Turma B,2,false,true,false,true,true,false\n\
        a3,103,Caio,Turma B,2,false,false,true,true,true,false\n\
        a4,104,Dora,Turma A,-,true,false,false,true,true,true\n\
        a5,105,Enzo,Turma A,-,false,false,true,true,true,true\n\
        a6,106,Fabi,Turma B,2,true,false,false,true,true,false\n";

    #[test]
    fn single_draw_writes_both_lists() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("in.csv"), SIMPLE).unwrap();
        let mut s = settings(&dir, "in.csv");
        s.outputs.admitted = Some(out(&dir, "out/aprovados.csv"));
        s.outputs.waitlisted = Some(out(&dir, "out/espera.csv"));
        s.outputs.summary = Some(out(&dir, "summary.json"));
        run_draw(&s).unwrap();

        let admitted = data_lines(&out(&dir, "out/aprovados.csv"));
        let waitlisted = data_lines(&out(&dir, "out/espera.csv"));
        assert_eq!(admitted.len(), 3);
        assert_eq!(waitlisted.len(), 2);

        let summary = read_summary(&out(&dir, "summary.json")).unwrap();
        assert_eq!(summary["config"]["input"], json!("in.csv"));
        assert_eq!(summary["results"][0]["slots"], json!(3));
        assert_eq!(summary["results"][0]["quotas"]["Aluno"], json!(2));
        assert_eq!(summary["results"][0]["quotas"]["Servidor"], json!(1));
        assert_eq!(summary["results"][0]["quotas"]["Comunidade Externa"], json!(0));
    }

    #[test]
    fn same_seed_same_summary() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("in.csv"), SIMPLE).unwrap();
        let mut s = settings(&dir, "in.csv");
        s.outputs.summary = Some(out(&dir, "first.json"));
        run_draw(&s).unwrap();
        s.outputs.summary = Some(out(&dir, "second.json"));
        run_draw(&s).unwrap();
        assert_eq!(
            fs::read_to_string(out(&dir, "first.json")).unwrap(),
            fs::read_to_string(out(&dir, "second.json")).unwrap()
        );
    }

    #[test]
    fn reference_check() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("in.csv"), SIMPLE).unwrap();
        let mut s = settings(&dir, "in.csv");
        s.outputs.summary = Some(out(&dir, "reference.json"));
        run_draw(&s).unwrap();

        s.outputs.summary = None;
        s.reference = Some(out(&dir, "reference.json"));
        assert!(run_draw(&s).is_ok());

        s.seed = 43;
        fs::write(dir.path().join("other.json"), "{\"results\": []}").unwrap();
        s.reference = Some(out(&dir, "other.json"));
        assert!(matches!(
            run_draw(&s),
            Err(DrawError::ReferenceMismatch { .. })
        ));
    }

    #[test]
    fn invalid_shares_fail() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("in.csv"), SIMPLE).unwrap();
        let mut s = settings(&dir, "in.csv");
        s.shares = Shares::new(0.0, 0.0, 0.0);
        assert!(matches!(
            run_draw(&s),
            Err(DrawError::Lottery {
                source: LotteryErrors::InvalidShares
            })
        ));
    }

    #[test]
    fn schema_error_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("in.csv"), "id,name\n1,Ana\n").unwrap();
        let s = settings(&dir, "in.csv");
        assert!(matches!(run_draw(&s), Err(DrawError::Schema { .. })));
    }

    #[test]
    fn grouped_draw() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("in.csv"), REGISTRATION).unwrap();
        let mut s = settings(&dir, "in.csv");
        s.per_group = true;
        s.slots = Some(1);
        s.outputs.admitted = Some(out(&dir, "res/"));
        s.outputs.waitlisted = Some(out(&dir, "res/"));
        s.outputs.consolidated_admitted = Some(out(&dir, "all_admitted.csv"));
        s.outputs.consolidated_waitlisted = Some(out(&dir, "all_waitlisted.csv"));
        s.outputs.summary = Some(out(&dir, "summary.json"));
        run_draw(&s).unwrap();

        // Turma B reads its slots from the input, Turma A falls back to the default.
        let b_admitted = data_lines(&out(&dir, "res_Turma_B_aprovados.csv"));
        let b_waitlisted = data_lines(&out(&dir, "res_Turma_B_espera.csv"));
        assert_eq!(b_admitted.len(), 2);
        // Caio is external, and Turma B does not accept external candidates.
        assert_eq!(b_waitlisted.len(), 1);
        assert!(b_admitted
            .iter()
            .chain(b_waitlisted.iter())
            .all(|l| !l.contains("Caio")));
        assert_eq!(data_lines(&out(&dir, "res_Turma_A_aprovados.csv")).len(), 1);
        assert_eq!(data_lines(&out(&dir, "res_Turma_A_espera.csv")).len(), 1);

        let all_admitted = data_lines(&out(&dir, "all_admitted.csv"));
        assert_eq!(all_admitted.len(), 3);
        assert!(all_admitted[0].contains(",Turma A,"));
        assert!(all_admitted[1].contains(",Turma B,"));
        assert!(all_admitted[2].contains(",Turma B,"));
        assert_eq!(data_lines(&out(&dir, "all_waitlisted.csv")).len(), 2);

        let summary = read_summary(&out(&dir, "summary.json")).unwrap();
        let results = summary["results"].as_array().unwrap();
        // The groups are listed in the order of the input.
        assert_eq!(results[0]["group"], json!("Turma B"));
        assert_eq!(results[0]["slots"], json!(2));
        assert_eq!(results[1]["group"], json!("Turma A"));
        assert_eq!(
            results[0]["seed"],
            json!(derive_group_seed(42, "Turma B"))
        );
    }

    #[test]
    fn group_slots_precedence() {
        let cs = vec![
            {
                let mut c = Candidate::new("1", "Ana", Category::Student).with_group("A");
                c.extra
                    .push((GROUP_SLOTS_COLUMN.to_string(), "-".to_string()));
                c
            },
            {
                let mut c = Candidate::new("2", "Bia", Category::Student).with_group("A");
                c.extra
                    .push((GROUP_SLOTS_COLUMN.to_string(), "4 vagas".to_string()));
                c
            },
            Candidate::new("3", "Caio", Category::Staff).with_group("B"),
            Candidate::new("4", "Duda", Category::Staff),
        ];

        let from_input = resolve_group_slots(&cs, None, None);
        assert_eq!(from_input.get("A"), Some(&4));
        assert_eq!(from_input.get("B"), None);
        assert_eq!(from_input.get(""), None);

        let with_default = resolve_group_slots(&cs, None, Some(2));
        assert_eq!(with_default.get("A"), Some(&4));
        assert_eq!(with_default.get("B"), Some(&2));
        assert_eq!(with_default.get(""), Some(&2));

        let explicit: BTreeMap<String, u32> = [("B".to_string(), 1)].into_iter().collect();
        let with_explicit = resolve_group_slots(&cs, Some(&explicit), None);
        assert_eq!(with_explicit.get("A"), None);
        assert_eq!(with_explicit.get("B"), Some(&1));
    }
}
