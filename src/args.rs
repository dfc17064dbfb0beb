use clap::Parser;

/// This program imports the results of a vote from csv or excel files and
/// prints the aggregated results.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file describing the vote, its entities and the result files, in JSON format.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing the summary of the vote in JSON format. If provided, votetally will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the vote will be written in JSON format to the given
    /// location. Otherwise it is printed to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the results of every entity will be written in csv format to the given
    /// location.
    #[clap(long, value_parser)]
    pub export: Option<String>,

    /// (file path or empty) If specified, this result file is imported instead of the sources listed in the
    /// configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv, xls or xlsx) The type of the input. Guessed from the file extension if not given.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default proposal) The ballot of the input: proposal, counter-proposal or tie-breaker.
    #[clap(long, value_parser)]
    pub ballot_type: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
