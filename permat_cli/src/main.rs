//! `persistence` — compute persistence pairs from a flat filtration file.
//!
//! The input holds one cell per line, in filtration order:
//!
//! ```text
//! dim filtration face_1 .. face_k          # Z/2
//! dim filtration face_1:coeff_1 ..         # Z/p
//! ```
//!
//! Cell ids are the 0-based line order. Output is one pair per line as
//! `dim birth death`, with `inf` for essential classes. Exit code 0 on
//! success, 2 on malformed input, 3 on cancellation.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::info;

use permat::columns::{BTreeColumn, Column, HashColumn, HeapColumn, ListColumn, VectorColumn};
use permat::diagram::{write_intervals, Diagram, RepresentativeCycle};
use permat::fields::{Invertible, NonZeroCoefficient, Z11, Z13, Z2, Z3, Z5, Z7};
use permat::filtration::{feed, FiltrationRecord};
use permat::matrices::{BoundaryMatrix, ChainMatrix, RuMatrix};
use permat::reduction::{chunk_reduction, standard_reduction, twist_reduction, CancelFlag};
use permat::PermatError;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MatrixKind {
    Boundary,
    Ru,
    Chain,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColumnKind {
    Vector,
    List,
    Hash,
    Heap,
    Btree,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algorithm {
    Standard,
    Twist,
    Chunk,
}

#[derive(Parser, Debug)]
#[command(name = "persistence", version, about = "Persistent homology of a filtration file")]
struct Cli {
    /// Input filtration file; `-` reads stdin
    #[arg(long = "in", value_name = "FILE")]
    input: PathBuf,

    /// Field characteristic (2, 3, 5, 7, 11 or 13)
    #[arg(long, default_value_t = 2)]
    field: u64,

    /// Matrix species to reduce
    #[arg(long, value_enum, default_value_t = MatrixKind::Boundary)]
    matrix: MatrixKind,

    /// Column container
    #[arg(long, value_enum, default_value_t = ColumnKind::Vector)]
    column: ColumnKind,

    /// Reduction driver (ignored by the chain matrix)
    #[arg(long, value_enum, default_value_t = Algorithm::Twist)]
    algorithm: Algorithm,

    /// Output file; stdout when omitted
    #[arg(long = "out", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Drop finite pairs with persistence below this value
    #[arg(long, default_value_t = 0.0)]
    min_persistence: f64,

    /// Also write representative cycles (`pair_id: cell ids`) to this file;
    /// requires the ru or chain matrix
    #[arg(long, value_name = "FILE")]
    cycles_out: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let text = match read_input(&cli.input) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("persistence: cannot read input: {err}");
            return ExitCode::from(2);
        }
    };
    let records = match parse_records(&text) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("persistence: {err}");
            return ExitCode::from(2);
        }
    };
    info!("parsed {} cells", records.len());

    match run(&cli, records) {
        Ok((diagram, cycles)) => {
            if let Err(err) = write_output(&cli, &diagram, cycles.as_deref()) {
                eprintln!("persistence: cannot write output: {err}");
                return ExitCode::from(2);
            }
            ExitCode::SUCCESS
        }
        Err(PermatError::Canceled) => {
            eprintln!("persistence: canceled");
            ExitCode::from(3)
        }
        Err(err) => {
            eprintln!("persistence: {err}");
            ExitCode::from(2)
        }
    }
}

fn read_input(path: &PathBuf) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
    }
}

fn parse_records(text: &str) -> Result<Vec<FiltrationRecord>, String> {
    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let dimension: u32 = tokens
            .next()
            .ok_or_else(|| format!("line {}: missing dimension", line_no + 1))?
            .parse()
            .map_err(|_| format!("line {}: bad dimension", line_no + 1))?;
        let filtration: f64 = tokens
            .next()
            .ok_or_else(|| format!("line {}: missing filtration value", line_no + 1))?
            .parse()
            .map_err(|_| format!("line {}: bad filtration value", line_no + 1))?;
        let mut boundary = Vec::new();
        let mut coefficients = Vec::new();
        let mut with_coefficients = false;
        for token in tokens {
            match token.split_once(':') {
                Some((face, coeff)) => {
                    with_coefficients = true;
                    boundary.push(
                        face.parse()
                            .map_err(|_| format!("line {}: bad face id", line_no + 1))?,
                    );
                    coefficients.push(
                        coeff
                            .parse()
                            .map_err(|_| format!("line {}: bad coefficient", line_no + 1))?,
                    );
                }
                None => {
                    boundary.push(
                        token
                            .parse()
                            .map_err(|_| format!("line {}: bad face id", line_no + 1))?,
                    );
                    coefficients.push(1);
                }
            }
        }
        records.push(FiltrationRecord {
            id: records.len() as u64,
            dimension,
            boundary,
            coefficients: with_coefficients.then_some(coefficients),
            filtration,
        });
    }
    Ok(records)
}

type RunOutput = (Diagram, Option<Vec<RepresentativeCycle>>);

fn run(cli: &Cli, records: Vec<FiltrationRecord>) -> Result<RunOutput, PermatError> {
    match cli.field {
        2 => run_field::<Z2>(cli, records),
        3 => run_field::<Z3>(cli, records),
        5 => run_field::<Z5>(cli, records),
        7 => run_field::<Z7>(cli, records),
        11 => run_field::<Z11>(cli, records),
        13 => run_field::<Z13>(cli, records),
        _ => Err(PermatError::InvalidFieldArgument(
            "field must be one of 2, 3, 5, 7, 11, 13",
        )),
    }
}

fn run_field<CF>(cli: &Cli, records: Vec<FiltrationRecord>) -> Result<RunOutput, PermatError>
where
    CF: NonZeroCoefficient + Invertible + Send + Sync,
{
    match cli.column {
        ColumnKind::Vector => run_column::<VectorColumn<CF>>(cli, records),
        ColumnKind::List => run_column::<ListColumn<CF>>(cli, records),
        ColumnKind::Hash => run_column::<HashColumn<CF>>(cli, records),
        ColumnKind::Heap => run_column::<HeapColumn<CF>>(cli, records),
        ColumnKind::Btree => run_column::<BTreeColumn<CF>>(cli, records),
    }
}

fn run_column<C>(cli: &Cli, records: Vec<FiltrationRecord>) -> Result<RunOutput, PermatError>
where
    C: Column + Send,
    C::Coefficient: Invertible + Send + Sync,
{
    let cancel = CancelFlag::new();
    let want_cycles = cli.cycles_out.is_some();
    match cli.matrix {
        MatrixKind::Boundary => {
            if want_cycles {
                return Err(PermatError::InvalidFieldArgument(
                    "representative cycles require the ru or chain matrix",
                ));
            }
            let mut matrix = BoundaryMatrix::<C>::new();
            let filtration = feed(&mut matrix, records)?;
            match cli.algorithm {
                Algorithm::Standard => standard_reduction(&mut matrix, &cancel)?,
                Algorithm::Twist => twist_reduction(&mut matrix, &cancel)?,
                Algorithm::Chunk => chunk_reduction(&mut matrix, &cancel)?,
            }
            Ok((matrix.index_pairs().with_filtration(&filtration), None))
        }
        MatrixKind::Ru => {
            let mut matrix = RuMatrix::<C>::new();
            let filtration = feed(&mut matrix, records)?;
            match cli.algorithm {
                Algorithm::Standard => standard_reduction(&mut matrix, &cancel)?,
                Algorithm::Twist => twist_reduction(&mut matrix, &cancel)?,
                Algorithm::Chunk => chunk_reduction(&mut matrix, &cancel)?,
            }
            let index_diagram = matrix.index_pairs();
            let cycles = want_cycles.then(|| {
                index_diagram
                    .pairs
                    .iter()
                    .map(|pair| matrix.representative_cycle(pair))
                    .collect()
            });
            Ok((index_diagram.with_filtration(&filtration), cycles))
        }
        MatrixKind::Chain => {
            let mut matrix = ChainMatrix::<C>::new();
            let filtration = feed(&mut matrix, records)?;
            let index_diagram = matrix.index_pairs();
            let cycles = want_cycles.then(|| {
                index_diagram
                    .pairs
                    .iter()
                    .filter_map(|pair| matrix.representative_cycle(pair))
                    .collect()
            });
            Ok((index_diagram.with_filtration(&filtration), cycles))
        }
    }
}

fn write_output(
    cli: &Cli,
    diagram: &Diagram,
    cycles: Option<&[RepresentativeCycle]>,
) -> io::Result<()> {
    match &cli.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write_intervals(&mut out, diagram, cli.min_persistence)?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_intervals(&mut out, diagram, cli.min_persistence)?;
        }
    }
    if let (Some(path), Some(cycles)) = (&cli.cycles_out, cycles) {
        let mut out = BufWriter::new(File::create(path)?);
        for cycle in cycles {
            write!(out, "{}:", cycle.pair_id)?;
            for id in &cycle.chain {
                write!(out, " {id}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}
