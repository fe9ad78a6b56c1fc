use clap::*;
use dada::libs::calibrate::calibrate_kmers;
use dada::libs::io::read_uniques;
use dada::libs::matrix::ScoreMatrix;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("calibrate")
        .about("Compares alignment and k-mer distances of sampled sequence pairs")
        .after_help(
            r###"
This command aligns pairs of input sequences and reports, for each pair, the alignment
distance (substitutions over the shorter length) next to the k-mer distance. Plotting one
against the other helps choosing --kdist-cutoff for `dada denoise`.

Notes:
* Input is the same TSV or FASTA accepted by `dada denoise`; abundances are ignored
* When --max-aligns is below the number of pairs, pairs are taken with a stride spread
  over the whole input
* Output columns: align, kmer

Examples:
1. Up to 1000 pairs:
   dada calibrate tests/dada/uniques.tsv --max-aligns 1000

2. With 4 threads:
   dada calibrate uniques.tsv --max-aligns 100000 --parallel 4 -o calib.tsv

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Input TSV or FASTA file. [stdin] for standard input"),
        )
        .arg(
            Arg::new("max_aligns")
                .long("max-aligns")
                .num_args(1)
                .default_value("1000")
                .value_parser(value_parser!(usize))
                .help("Maximum number of pairs to align"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads for parallel processing"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        );

    super::align_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let opt_max_aligns = *args.get_one::<usize>("max_aligns").unwrap();
    let opt_gap = *args.get_one::<f64>("gap").unwrap();

    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;

    let score = ScoreMatrix::from_rows(&super::score_rows(args)?)?;

    //----------------------------
    // Operating
    //----------------------------
    let table = read_uniques(infile)?;
    let cal = calibrate_kmers(
        &table.seqs,
        &score,
        opt_gap,
        super::band(args),
        opt_max_aligns,
    )?;

    let mut writer = dada::writer(args.get_one::<String>("outfile").unwrap())?;
    writer.write_all(b"align\tkmer\n")?;
    for (a, k) in cal.align.iter().zip(cal.kmer.iter()) {
        writer.write_fmt(format_args!("{:.6}\t{:.6}\n", a, k))?;
    }

    Ok(())
}
