pub mod align;
pub mod calibrate;
pub mod cluster;
pub mod error;
pub mod input;
pub mod io;
pub mod kmer;
pub mod lambda;
pub mod matrix;
pub mod nt;
pub mod pval;
