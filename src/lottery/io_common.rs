// Layout detection shared by the CSV and the Excel readers.

use crate::lottery::*;

/// A table read from an input file: the header, then the records as strings.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// A record, with the line of the file it starts on (the header is line 1).
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawRow {
    pub lineno: usize,
    pub cells: Vec<String>,
}

impl RawTable {
    fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == name)
    }
}

const REAL_GROUP: &str = "Turma [Vaga]";
const REAL_NAME: &str = "Nome [Candidato]";
const REAL_ID: &str = "Id [Candidato]";
const REAL_CANDIDATE_FLAGS: [(&str, Category); 3] = [
    ("Aluno [Candidato]", Category::Student),
    ("Servidor [Candidato]", Category::Staff),
    ("Externo [Candidato]", Category::ExternalCommunity),
];
const REAL_GROUP_FLAGS: [(&str, Category); 3] = [
    ("Aluno [Vaga]", Category::Student),
    ("Servidor [Vaga]", Category::Staff),
    ("Externo [Vaga]", Category::ExternalCommunity),
];

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "sim" | "yes" | "y"
    )
}

/// Reads the first run of digits of a cell, such as "12 vagas".
pub fn parse_int_maybe(value: &str) -> Option<u32> {
    let s = value.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok()
}

/// Turns the records of a table into candidates.
///
/// Two layouts are understood. The registration export (with the columns
/// `Turma [Vaga]` and `Nome [Candidato]`) carries the category as one flag per
/// category, and the categories accepted by each group. The simple layout has
/// the columns `id`, `nome`, `categoria` and optionally `turma`.
pub fn table_to_candidates(path: &str, table: &RawTable) -> DrawResult<Vec<Candidate>> {
    let is_real = table.column(REAL_GROUP).is_some() && table.column(REAL_NAME).is_some();
    debug!(
        "table_to_candidates: path: {:?} header: {:?} registration layout: {:?}",
        path, table.header, is_real
    );
    if is_real {
        read_registration_layout(path, table)
    } else {
        read_simple_layout(path, table)
    }
}

// Ids are unique in a file, explicit or generated.
fn check_unique_id(
    path: &str,
    seen: &mut HashMap<String, usize>,
    id: &str,
    lineno: usize,
) -> DrawResult<()> {
    if let Some(first) = seen.insert(id.to_string(), lineno) {
        return SchemaSnafu {
            path,
            message: format!(
                "line {}: the id {:?} was already used on line {}",
                lineno, id, first
            ),
        }
        .fail();
    }
    Ok(())
}

fn extra_fields(header: &[String], row: &[String]) -> Vec<(String, String)> {
    header
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), row.get(i).cloned().unwrap_or_default()))
        .collect()
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| row.get(i)).map(|s| s.as_str())
}

fn read_registration_layout(path: &str, table: &RawTable) -> DrawResult<Vec<Candidate>> {
    let default_id = make_default_id(path);
    let id_idx = table.column(REAL_ID);
    let name_idx = table.column(REAL_NAME);
    let group_idx = table.column(REAL_GROUP);
    let candidate_flags: Vec<(Option<usize>, Category)> = REAL_CANDIDATE_FLAGS
        .iter()
        .map(|(col, cat)| (table.column(col), *cat))
        .collect();
    let group_flags: Vec<(Option<usize>, Category)> = REAL_GROUP_FLAGS
        .iter()
        .map(|(col, cat)| (table.column(col), *cat))
        .collect();
    let has_group_flags = group_flags.iter().any(|(idx, _)| idx.is_some());

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut res: Vec<Candidate> = Vec::new();
    for raw in table.rows.iter() {
        let (lineno, row) = (raw.lineno, raw.cells.as_slice());
        let id = match cell(row, id_idx).map(|s| s.trim()) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => default_id(lineno),
        };
        check_unique_id(path, &mut seen, &id, lineno)?;
        let category = candidate_flags
            .iter()
            .find(|(col, _)| cell(row, *col).map(is_truthy).unwrap_or(false))
            .map(|(_, cat)| *cat)
            .unwrap_or(Category::ExternalCommunity);
        // An absent column accepts the category.
        let group_categories = if has_group_flags {
            Some(
                group_flags
                    .iter()
                    .filter(|(col, _)| {
                        col.is_none() || cell(row, *col).map(is_truthy).unwrap_or(false)
                    })
                    .map(|(_, cat)| *cat)
                    .collect(),
            )
        } else {
            None
        };
        let c = Candidate {
            id,
            name: cell(row, name_idx).unwrap_or("").trim().to_string(),
            category,
            group: Some(cell(row, group_idx).unwrap_or("").trim().to_string()),
            group_categories,
            extra: extra_fields(&table.header, row),
        };
        debug!("read_registration_layout: line {:?}: {:?}", lineno, c);
        res.push(c);
    }
    Ok(res)
}

fn read_simple_layout(path: &str, table: &RawTable) -> DrawResult<Vec<Candidate>> {
    let missing: Vec<&str> = ["id", "nome", "categoria"]
        .into_iter()
        .filter(|col| table.column(col).is_none())
        .collect();
    if !missing.is_empty() {
        return SchemaSnafu {
            path,
            message: format!("missing required columns: {}", missing.join(", ")),
        }
        .fail();
    }
    let default_id = make_default_id(path);
    let id_idx = table.column("id");
    let name_idx = table.column("nome");
    let cat_idx = table.column("categoria");
    let group_idx = table.column("turma");

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut res: Vec<Candidate> = Vec::new();
    for raw in table.rows.iter() {
        let (lineno, row) = (raw.lineno, raw.cells.as_slice());
        let label = cell(row, cat_idx).unwrap_or("").trim();
        let category = Category::from_label(label).with_context(|| SchemaSnafu {
            path,
            message: format!(
                "line {}: invalid category {:?}, expected one of {:?}",
                lineno,
                label,
                Category::ALL.map(|c| c.label())
            ),
        })?;
        let id = match cell(row, id_idx).map(|s| s.trim()) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => default_id(lineno),
        };
        check_unique_id(path, &mut seen, &id, lineno)?;
        res.push(Candidate {
            id,
            name: cell(row, name_idx).unwrap_or("").trim().to_string(),
            category,
            group: group_idx.map(|_| cell(row, group_idx).unwrap_or("").trim().to_string()),
            group_categories: None,
            extra: extra_fields(&table.header, row),
        });
    }
    Ok(res)
}
