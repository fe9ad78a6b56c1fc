use clap::*;
use dada::libs::align::{align_endsfree, AlignParams, Sub};
use dada::libs::kmer::{kmer_dist, KMER_SIZE};
use dada::libs::matrix::ScoreMatrix;
use dada::libs::nt::{decode_seq, encode_seq};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("align")
        .about("Aligns two sequences the way the denoiser does")
        .after_help(
            r###"
Global alignment with free end gaps, restricted to a band around the diagonal.

Output:
* The two aligned rows, gaps shown as `-`
* score, nsubs, ngaps and kdist, one per line, tab separated

Notes:
* N scores 0 against anything and is never counted as a substitution
* The band is widened to the length difference of the two sequences

Examples:
1. Two short sequences:
   dada align ACGTACGTAC ACGTTCGTAC

2. Without a band:
   dada align ACGTACGTACGGT ACGTACGTAC --unbanded

"###,
        )
        .arg(
            Arg::new("seq1")
                .required(true)
                .num_args(1)
                .index(1)
                .help("First sequence"),
        )
        .arg(
            Arg::new("seq2")
                .required(true)
                .num_args(1)
                .index(2)
                .help("Second sequence"),
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
    let s1 = encode_seq(args.get_one::<String>("seq1").unwrap(), 0)?;
    let s2 = encode_seq(args.get_one::<String>("seq2").unwrap(), 1)?;

    let params = AlignParams {
        score: ScoreMatrix::from_rows(&super::score_rows(args)?)?,
        gap: *args.get_one::<f64>("gap").unwrap(),
        band: super::band(args),
    };

    //----------------------------
    // Operating
    //----------------------------
    let al = align_endsfree(&s1, &s2, &params);
    let sub = Sub::from_alignment(&al);

    let mut writer = dada::writer(args.get_one::<String>("outfile").unwrap())?;
    writer.write_fmt(format_args!("{}\n{}\n", decode_seq(&al.rows[0]), decode_seq(&al.rows[1])))?;
    writer.write_fmt(format_args!("score\t{}\n", al.score))?;
    writer.write_fmt(format_args!("nsubs\t{}\n", sub.nsubs))?;
    writer.write_fmt(format_args!("ngaps\t{}\n", sub.ngaps))?;
    writer.write_fmt(format_args!("kdist\t{:.6}\n", kmer_dist(&s1, &s2, KMER_SIZE)))?;

    Ok(())
}
