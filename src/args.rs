use clap::Parser;

/// This is a lottery program that allocates slots between candidates, with quotas per category.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file with the settings of the lottery. The other options
    /// override the values of this file. See the manual for the format of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The file containing the candidates, in CSV or Excel format.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv or xlsx, default: from the extension of the input) The type of the input.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// The total number of slots. Required for a single lottery. With --per-group, it is the
    /// number of slots of the groups that have no other definition.
    #[clap(short, long, value_parser)]
    pub slots: Option<u32>,

    /// Share of the slots for the students (Aluno), between 0 and 1.
    #[clap(long, value_parser)]
    pub pct_student: Option<f64>,

    /// Share of the slots for the staff (Servidor), between 0 and 1.
    #[clap(long, value_parser)]
    pub pct_staff: Option<f64>,

    /// Share of the slots for the external community (Comunidade Externa), between 0 and 1.
    #[clap(long, value_parser)]
    pub pct_external: Option<f64>,

    /// The seed of the draw. The same seed always gives the same outcome.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// If passed as an argument, runs a separate lottery for each group (column 'Turma [Vaga]').
    #[clap(long, takes_value = false)]
    pub per_group: bool,

    /// (format: GROUP=NUM;GROUP2=NUM2) The number of slots of each group. If not specified,
    /// it is read from the column 'Quantidade vagas [Vaga]' of the input.
    #[clap(long, value_parser)]
    pub group_slots: Option<String>,

    /// (file path) The CSV file for the admitted candidates. With --per-group, the prefix of
    /// the file of each group.
    #[clap(long, value_parser)]
    pub out_admitted: Option<String>,

    /// (file path) The CSV file for the waitlist. With --per-group, the prefix of the file of
    /// each group.
    #[clap(long, value_parser)]
    pub out_waitlisted: Option<String>,

    /// (file path) With --per-group, a single CSV file with the admitted candidates of all the
    /// groups.
    #[clap(long, value_parser)]
    pub out_consolidated_admitted: Option<String>,

    /// (file path) With --per-group, a single CSV file with the waitlists of all the groups.
    #[clap(long, value_parser)]
    pub out_consolidated_waitlisted: Option<String>,

    /// (file path, 'stdout' or empty) If specified, a summary of the draw will be written in
    /// JSON format to the given location.
    #[clap(long, value_parser)]
    pub summary: Option<String>,

    /// (file path) A summary of a previous draw in JSON format. If provided, qlottery will
    /// check that the outcome matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
