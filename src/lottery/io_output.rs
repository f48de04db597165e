// Writing the lists of candidates.

use crate::lottery::*;

/// The columns of every output file.
pub const OUTPUT_HEADER: [&str; 5] = [
    "Id [Candidato]",
    "Número de sorteio",
    "Nome [Candidato]",
    "Turma [Vaga]",
    "Categoria",
];

/// The output record of a candidate. `pool_group` is only used when the
/// candidate carries no group.
pub fn project(c: &Candidate, pool_group: &str) -> [String; 5] {
    [
        c.id.clone(),
        c.field("Numero").unwrap_or("").to_string(),
        c.name.clone(),
        c.group.clone().unwrap_or_else(|| pool_group.to_string()),
        c.category.label().to_string(),
    ]
}

pub fn write_candidates(path: &str, records: &[[String; 5]]) -> DrawResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(CreatingDirSnafu {
                path: parent.display().to_string(),
            })?;
        }
    }
    let mut wtr = csv::Writer::from_path(path).context(WritingCsvSnafu { path })?;
    wtr.write_record(OUTPUT_HEADER)
        .context(WritingCsvSnafu { path })?;
    for r in records.iter() {
        wtr.write_record(r).context(WritingCsvSnafu { path })?;
    }
    wtr.flush().context(WritingFileSnafu { path })?;
    info!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}

/// The file of a group: `<base>_<group>_<suffix>.csv`.
pub fn group_output_path(base: &str, group: &str, suffix: &str) -> String {
    let base = base.trim_end_matches('/');
    let safe_group = group.replace('/', "-").replace(' ', "_");
    format!("{}_{}_{}.csv", base, safe_group, suffix)
}
