use clap::*;
use dada::libs::cluster::run_dada;
use dada::libs::input::DadaInput;
use dada::libs::io::{read_uniques, write_genotypes_fasta, write_genotypes_tsv};
use dada::libs::matrix::{read_matrix, write_trans, ErrorMatrix};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("denoise")
        .about("Infers true sequences from dereplicated amplicon reads")
        .after_help(
            r###"
Starting with every unique sequence in one cluster, this command repeatedly splits off the
family of reads least likely to be sequencing errors of its cluster's center, until no family
is significant. Each final cluster is one inferred true sequence.

Input:
* A TSV of `sequence<TAB>abundance`, with an optional header line and `#` comments
* Or a FASTA file. Headers carrying `;size=N` count N reads; identical sequences are merged
* Supports both plain text and gzipped (.gz) files
* Reads from stdin if input file is 'stdin'

Output columns:
* sequence, abundance, n_uniques, birth_pval
* Clusters are listed in the order they were created

Notes:
* --err takes a 4x4 matrix of substitution rates, rows are the true base in A C G T order.
  The default has 0.001 off the diagonal
* --score takes a 4x4 matrix in the same layout
* Matrix files are whitespace separated; `#` comments, an `A C G T` header and row labels
  are allowed
* Abundance p-values are tested against --omega-a. Singletons are only tested when
  --singletons is set, against --omega-s
* --trans writes the substitution counts of the final clustering, weighted by abundance

Examples:
1. Denoise a table of uniques:
   dada denoise tests/dada/uniques.tsv

2. Dereplicate and denoise reads, output FASTA:
   dada denoise reads.fa --fasta -o asv.fa

3. Use an error model and keep the transition counts:
   dada denoise uniques.tsv --err err.tsv --trans trans.tsv

4. Test singletons too:
   dada denoise uniques.tsv --singletons --omega-s 1e-6

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
            Arg::new("err")
                .long("err")
                .num_args(1)
                .help("4x4 error rate matrix file"),
        )
        .arg(
            Arg::new("no_kmers")
                .long("no-kmers")
                .action(ArgAction::SetTrue)
                .help("Align every pair, without the k-mer distance screen"),
        )
        .arg(
            Arg::new("kdist_cutoff")
                .long("kdist-cutoff")
                .num_args(1)
                .default_value("0.5")
                .value_parser(value_parser!(f64))
                .help("Pairs beyond this k-mer distance are not aligned"),
        )
        .arg(
            Arg::new("omega_a")
                .long("omega-a")
                .num_args(1)
                .default_value("0.01")
                .value_parser(value_parser!(f64))
                .help("Significance threshold of abundance p-values"),
        )
        .arg(
            Arg::new("singletons")
                .long("singletons")
                .action(ArgAction::SetTrue)
                .help("Also test families seen only once"),
        )
        .arg(
            Arg::new("omega_s")
                .long("omega-s")
                .num_args(1)
                .default_value("0.001")
                .value_parser(value_parser!(f64))
                .help("Significance threshold of singleton p-values"),
        )
        .arg(
            Arg::new("max_clust")
                .long("max-clust")
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help("Stop once this many clusters exist"),
        )
        .arg(
            Arg::new("fasta")
                .long("fasta")
                .action(ArgAction::SetTrue)
                .help("Write genotypes as FASTA"),
        )
        .arg(
            Arg::new("trans")
                .long("trans")
                .num_args(1)
                .help("Write the transition matrix to this file"),
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

    let opt_gap = *args.get_one::<f64>("gap").unwrap();
    let opt_kdist = *args.get_one::<f64>("kdist_cutoff").unwrap();
    let opt_omega_a = *args.get_one::<f64>("omega_a").unwrap();
    let opt_omega_s = *args.get_one::<f64>("omega_s").unwrap();
    let is_no_kmers = args.get_flag("no_kmers");
    let is_singletons = args.get_flag("singletons");
    let is_fasta = args.get_flag("fasta");

    // Set the number of threads for rayon
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;

    let score = super::score_rows(args)?;
    let err = match args.get_one::<String>("err") {
        Some(file) => read_matrix(dada::reader(file)?)?,
        None => ErrorMatrix::default().rows(),
    };

    //----------------------------
    // Operating
    //----------------------------
    let table = read_uniques(infile)?;
    log::info!(
        "Read {} uniques, {} reads",
        table.len(),
        table.abundances.iter().sum::<u64>()
    );

    let input = DadaInput {
        seqs: table.seqs,
        abundances: table.abundances,
        score,
        err,
        gap: vec![opt_gap],
        use_kmers: vec![!is_no_kmers],
        kdist_cutoff: vec![opt_kdist],
        omega_a: vec![opt_omega_a],
        use_singletons: vec![is_singletons],
        omega_s: vec![opt_omega_s],
    };
    let (uniques, mut params) = input.validate()?;
    params.align.band = super::band(args);
    params.max_clusters = args.get_one::<usize>("max_clust").copied();

    let output = run_dada(&uniques, &params)?;

    //----------------------------
    // Output
    //----------------------------
    let mut writer = dada::writer(args.get_one::<String>("outfile").unwrap())?;
    if is_fasta {
        write_genotypes_fasta(&mut writer, &output.genotypes)?;
    } else {
        write_genotypes_tsv(&mut writer, &output.genotypes)?;
    }

    if let Some(file) = args.get_one::<String>("trans") {
        let mut trans_writer = dada::writer(file)?;
        write_trans(&mut trans_writer, &output.trans)?;
    }

    Ok(())
}
