pub mod block_parser;
pub mod daily_file_reader;
pub mod filename;

pub use block_parser::{parse_daily_file, split_blocks, Block, Blocks, Line};
pub use daily_file_reader::DailyFileReader;
pub use filename::{resolve, resolve_path};
