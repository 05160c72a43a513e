use clap::Parser;

/// Ranks courses from the raw export of an exit survey.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The export of the survey, in Excel (.xlsx) or CSV format.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (directory path) The directory where the ranking, the charts and the summary are written.
    /// It is created if it does not exist.
    #[clap(short, long, value_parser)]
    pub output_dir: String,

    /// (xlsx or csv) The type of the input. By default, it is guessed from the extension of
    /// the input file.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path, optional) A JSON file with the name of the survey, the worksheet to read
    /// and the scoring rules. See the manual for all the options.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference ranking in CSV format. If provided, courserank will
    /// check that the computed ranking matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
