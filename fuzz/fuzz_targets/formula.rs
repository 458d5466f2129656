#![no_main]

use libfuzzer_sys::fuzz_target;
use libledgergrid::{eval, ledger::LedgerLine};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let lines = vec![
            LedgerLine::debit("Expenses", 100.0, 95),
            LedgerLine::credit("Vendor", 100.0, 95),
        ];
        let outcome = eval::evaluate(&lines, 1, text);
        assert!(outcome.result.is_finite());
    }
});
