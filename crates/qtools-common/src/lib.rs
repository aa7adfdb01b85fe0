pub mod q_shared;
pub mod qfiles;
pub mod error;
pub mod stream;
pub mod contentflags;
pub mod gamedef;
pub mod bspfile_generic;
pub mod bspfile_q1;
pub mod bspfile_q2;
pub mod bspxfile;
pub mod bspfile;
pub mod settings;
