use crate::libs::cluster::Genotype;
use anyhow::{anyhow, bail, Context};
use indexmap::IndexMap;
use std::io::{BufRead, BufReader, BufWriter, Write};

/// ```
/// use std::io::BufRead;
/// let reader = dada::reader("tests/dada/uniques.tsv").unwrap();
/// let lines: Vec<_> = reader.lines().collect();
/// assert_eq!(lines.len(), 7);
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .with_context(|| format!("could not create {}", output))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

/// Unique sequences with their abundances, as read from disk.
///
/// Sequences are kept as text; base validation happens when the table is
/// turned into engine input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniqueTable {
    pub seqs: Vec<String>,
    pub abundances: Vec<u64>,
}

impl UniqueTable {
    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }
}

/// Reads uniques from a TSV table or a FASTA file, told apart by the first byte.
pub fn read_uniques(input: &str) -> anyhow::Result<UniqueTable> {
    let mut reader = reader(input)?;

    let is_fasta = {
        let buf = reader.fill_buf()?;
        buf.iter()
            .find(|b| !b.is_ascii_whitespace())
            .map_or(false, |&b| b == b'>')
    };

    if is_fasta {
        read_uniques_fasta(reader)
    } else {
        read_uniques_tsv(reader)
    }
}

/// `sequence<TAB>abundance` lines.
///
/// Blank lines and lines starting with '#' are skipped. The first remaining
/// line is taken as a header when its abundance field is not a number.
pub fn read_uniques_tsv<R: BufRead>(reader: R) -> anyhow::Result<UniqueTable> {
    let mut table = UniqueTable::default();
    let mut first = true;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            bail!("line {}: expected sequence and abundance", lineno + 1);
        }

        let abundance = match fields[1].trim().parse::<u64>() {
            Ok(n) => n,
            Err(_) if first => {
                first = false;
                continue;
            }
            Err(e) => {
                return Err(anyhow!(
                    "line {}: invalid abundance {:?}: {}",
                    lineno + 1,
                    fields[1],
                    e
                ))
            }
        };
        first = false;

        table.seqs.push(fields[0].trim().to_string());
        table.abundances.push(abundance);
    }

    Ok(table)
}

/// Abundance from a `;size=N` annotation, as written by dereplicators.
///
/// ```
/// use dada::libs::io::parse_size;
/// assert_eq!(parse_size("uniq1;size=153;"), Some(153));
/// assert_eq!(parse_size("read7"), None);
/// ```
pub fn parse_size(header: &str) -> Option<u64> {
    header
        .split(';')
        .find_map(|part| part.trim().strip_prefix("size="))
        .and_then(|n| n.parse::<u64>().ok())
}

/// FASTA records collapsed by exact sequence, in order of first appearance.
///
/// A record counts `size=N` reads when its header carries the annotation,
/// one read otherwise.
pub fn read_uniques_fasta<R: BufRead>(reader: R) -> anyhow::Result<UniqueTable> {
    let mut fa_in = noodles_fasta::io::Reader::new(reader);
    let mut derep: IndexMap<String, u64> = IndexMap::new();

    for result in fa_in.records() {
        let record = result?;
        let name = String::from_utf8(record.name().into())?;
        let size = match parse_size(&name) {
            Some(n) => n,
            None => match record.description() {
                Some(desc) => parse_size(&String::from_utf8(desc.into())?).unwrap_or(1),
                None => 1,
            },
        };

        let seq: &[u8] = record.sequence().as_ref();
        let seq = String::from_utf8(seq.to_vec())?.to_ascii_uppercase();
        *derep.entry(seq).or_default() += size;
    }

    let (seqs, abundances) = derep.into_iter().unzip();
    Ok(UniqueTable { seqs, abundances })
}

pub fn write_genotypes_tsv(writer: &mut dyn Write, genotypes: &[Genotype]) -> anyhow::Result<()> {
    writer.write_all(b"sequence\tabundance\tn_uniques\tbirth_pval\n")?;
    for g in genotypes {
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{:e}\n",
            g.sequence, g.abundance, g.n_uniques, g.birth_pval
        ))?;
    }
    Ok(())
}

/// One record per genotype, named `ASV_<rank>;size=<abundance>`.
pub fn write_genotypes_fasta(writer: &mut dyn Write, genotypes: &[Genotype]) -> anyhow::Result<()> {
    for (i, g) in genotypes.iter().enumerate() {
        writer.write_fmt(format_args!(
            ">ASV_{};size={}\n{}\n",
            i + 1,
            g.abundance,
            g.sequence
        ))?;
    }
    Ok(())
}
