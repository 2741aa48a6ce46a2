use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::OrderCode;

pub const ORDER_CODE_LENGTH: usize = 6;

/// Generates a random order code made of upper-case letters and digits.
///
/// Codes are short enough to read out over the phone, so collisions are possible. The database has a unique
/// constraint on the code and callers retry on conflict.
pub fn generate_order_code() -> OrderCode {
    let code = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|c| (c as char).to_ascii_uppercase())
        .take(ORDER_CODE_LENGTH)
        .collect::<String>();
    OrderCode(code)
}
