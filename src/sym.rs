use crate::{*, error::*, gateway::*, model::*};

// C7: expression and symbol services, all of them thin wrappers around `x/b`/`disassemble`
// probes sent through the gateway as plain CLI-output commands. Grounded on
// check_for_restricted_gdb_symbols / convert_address_to_symbol / convert_symbol_to_address /
// disassemble / find_address_of_closest_instruction.

// `$` alone triggers the debugger's value-history side effect; a quoted string or a
// brace-enclosed array is exempt even though it may contain `$` inside it. Blank input is
// restricted too, since an empty expression makes the debugger redisplay its last value.
pub fn is_restricted_expression(expr: &str) -> bool {
    let t = expr.trim();
    if t.is_empty() {
        return true;
    }
    if t.starts_with('"') && t.ends_with('"') && t.len() >= 2 {
        return false;
    }
    if t.starts_with('{') && t.ends_with('}') && t.len() >= 2 {
        return false;
    }
    t.contains('$')
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Probe {
    Unreachable,
    WithSymbol {address: String, symbol: String},
    AddressOnly {address: String},
}

// Parses the `x/b <expr>` response shape: `0x<hex> <<symbol+off>>:\t0x..` or `0x<hex>:\t0x..`.
fn parse_probe(output: &str) -> Option<Probe> {
    if output.contains("Cannot access memory at address") {
        return Some(Probe::Unreachable);
    }
    let line = output.lines().map(str::trim).find(|l| l.starts_with("0x"))?;
    if let Some(lt) = line.find('<') {
        let gt = line[lt..].find('>')? + lt;
        let address = line[..lt].trim().to_string();
        let symbol = line[lt + 1..gt].to_string();
        Some(Probe::WithSymbol {address, symbol})
    } else {
        let colon = line.find(':')?;
        Some(Probe::AddressOnly {address: line[..colon].trim().to_string()})
    }
}

fn probe(gw: &Gateway, expr: &str) -> Result<Option<Probe>> {
    let opts = CommandOptions {cli_output: true, ..Default::default()};
    match gw.send_command(&format!("x/b {}", expr), opts)? {
        None => Ok(None),
        Some(resp) => Ok(parse_probe(&resp.into_text().unwrap_or_default())),
    }
}

// Unreachable expressions return the input unchanged; callers treat the result opaquely rather
// than trying to tell "still an expression" apart from "a resolved address".
pub fn symbol_to_address(gw: &Gateway, expr: &str, allow_restricted: bool) -> Result<Option<String>> {
    if is_restricted_expression(expr) && !allow_restricted {
        return Ok(Some(expr.to_string()));
    }
    match probe(gw, expr)? {
        None => Ok(None),
        Some(Probe::Unreachable) => Ok(Some(expr.to_string())),
        Some(Probe::WithSymbol {address, ..}) | Some(Probe::AddressOnly {address}) => Ok(Some(address)),
    }
}

pub fn address_to_symbol(gw: &Gateway, expr: &str, include_address: bool, allow_restricted: bool) -> Result<Option<String>> {
    if is_restricted_expression(expr) && !allow_restricted {
        return Ok(Some(expr.to_string()));
    }
    match probe(gw, expr)? {
        None => Ok(None),
        Some(Probe::Unreachable) => Ok(None),
        Some(Probe::WithSymbol {address, symbol}) => {
            Ok(Some(if include_address {format!("{} <{}>", address, symbol)} else {symbol}))
        }
        Some(Probe::AddressOnly {address}) => Ok(Some(address)),
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DisassembleEnd<'a> {
    PlusBytes(u64),
    Absolute(&'a str),
}

pub fn disassemble_range(gw: &Gateway, start_expr: &str, end: DisassembleEnd) -> Result<Option<Vec<DisassemblyRow>>> {
    let end_str = match end {
        DisassembleEnd::PlusBytes(n) => format!("+{}", n),
        DisassembleEnd::Absolute(addr) => addr.to_string(),
    };
    let opts = CommandOptions {cli_output: true, ..Default::default()};
    let cmd = format!("disas /r {},{}", start_expr, end_str);
    match gw.send_command(&cmd, opts)? {
        None => Ok(None),
        Some(resp) => Ok(Some(parse_disassembly(&resp.into_text().unwrap_or_default()))),
    }
}

// Rows look like `0x<hex> <sym+off>:\t<raw bytes, space separated>\t<mnemonic>`.
fn parse_disassembly(text: &str) -> Vec<DisassemblyRow> {
    let mut out = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.trim_start_matches(['=', '>', ' ']);
        if !line.starts_with("0x") {
            continue;
        }
        let mut fields = line.splitn(3, '\t');
        let addr_field = match fields.next() {Some(f) => f, None => continue};
        let bytes_field = match fields.next() {Some(f) => f, None => continue};
        let mnemonic = fields.next().unwrap_or("").to_string();

        let addr_hex = addr_field.split_whitespace().next().unwrap_or("").trim_end_matches(':');
        let addr = match addr_hex.strip_prefix("0x").and_then(|h| u64::from_str_radix(h, 16).ok()) {
            Some(a) => a,
            None => continue,
        };
        let bytes: Vec<u8> = bytes_field
            .split_whitespace()
            .filter_map(|tok| u8::from_str_radix(tok.trim_start_matches("0x"), 16).ok())
            .collect();
        out.push(DisassemblyRow {address: Address(addr), bytes, mnemonic});
    }
    out
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    Next,
    Previous,
}

// Resolves `expr` to a concrete address via the same probe symbol_to_address uses, then looks
// up the bounds of the /proc/<pid>/maps region that contains it.
fn resolve_region(gw: &Gateway, expr: &str) -> Result<Option<(u64, u64)>> {
    let resolved = match symbol_to_address(gw, expr, true)? {
        None => return Ok(None),
        Some(s) => s,
    };
    match crate::util::parse_hex_addr(&resolved) {
        Some(addr) => crate::procfs::region_bounds(gw.pid(), addr as u64),
        None => Ok(None),
    }
}

// The count-th row from the near edge: for Next, the row `count` steps after the window start
// (index 0 is the start address's own instruction); for Previous, the row `count` steps back
// from the window end. None if the window held fewer than `count` usable rows.
fn pick_row(rows: &[DisassemblyRow], count: u32, direction: Direction) -> Option<Address> {
    match direction {
        Direction::Next => rows.get(count as usize).map(|r| r.address),
        Direction::Previous => rows.len().checked_sub(count as usize).map(|i| rows[i].address),
    }
}

// Disassembles a window of count*30 bytes on the requested side and picks the count-th row.
// On underflow — the window runs past the edge of the mapped region — clamps to the region's
// actual start/end via /proc/<pid>/maps rather than whatever partial window was disassembled.
pub fn find_closest_instruction(gw: &Gateway, address: &str, count: u32, direction: Direction) -> Result<Option<Address>> {
    let window = (count as u64) * 30;
    let mut rows = match direction {
        Direction::Next => disassemble_range(gw, address, DisassembleEnd::PlusBytes(window))?,
        Direction::Previous => {
            let start = format!("{}-{}", address, window);
            disassemble_range(gw, &start, DisassembleEnd::Absolute(address))?
        }
    };

    let mut region_start = None;
    if direction == Direction::Previous && rows.as_ref().map_or(true, |r| r.is_empty()) {
        if let Some((start, _end)) = resolve_region(gw, address)? {
            region_start = Some(start);
            rows = disassemble_range(gw, &format!("0x{:x}", start), DisassembleEnd::Absolute(address))?;
        }
    }

    let rows = match rows {
        None => return Ok(None),
        Some(r) => r,
    };

    if let Some(addr) = pick_row(&rows, count, direction) {
        return Ok(Some(addr));
    }

    match direction {
        Direction::Next => match resolve_region(gw, address)? {
            Some((_, end)) => Ok(Some(Address(end))),
            None => Ok(None),
        },
        Direction::Previous => {
            let start = match region_start {
                Some(s) => Some(s),
                None => resolve_region(gw, address)?.map(|(s, _)| s),
            };
            Ok(start.map(Address))
        }
    }
}

// Grounded on read_single_address_by_expression: always reads in byte units (`x/Nxb`) so the
// resulting hex tokens can be reassembled uniformly, then decoded per `kind` the same way
// codec.rs decodes a file-backed read. Invalid length or a restricted expression both yield the
// literal sentinel "??" rather than an error, matching the original's contract.
pub fn read_by_expression(gw: &Gateway, expr: &str, kind: ValueKind, length: usize, allow_restricted: bool) -> Result<Option<String>> {
    if is_restricted_expression(expr) && !allow_restricted {
        return Ok(Some("??".to_string()));
    }
    let byte_count = match kind {
        ValueKind::ByteArray => length,
        ValueKind::String {encoding, ..} => match encoding {
            StringEncoding::Ascii => length,
            StringEncoding::Utf8 => length * 2,
        },
        _ => match kind.fixed_width() {
            Some(w) => w,
            None => return Ok(Some("??".to_string())),
        },
    };
    if byte_count == 0 && matches!(kind, ValueKind::ByteArray | ValueKind::String {..}) {
        return Ok(Some("??".to_string()));
    }

    let cmd = format!("x/{}xb {}", byte_count, expr);
    let opts = CommandOptions {cli_output: true, ..Default::default()};
    match gw.send_command(&cmd, opts)? {
        None => Ok(None),
        Some(resp) => {
            let bytes = extract_value_bytes(&resp.into_text().unwrap_or_default());
            if bytes.is_empty() {
                return Ok(Some("??".to_string()));
            }
            match kind {
                ValueKind::String {encoding, zero_terminated} => {
                    let raw = match encoding {
                        StringEncoding::Ascii => bytes.iter().map(|&b| b as char).collect::<String>(),
                        StringEncoding::Utf8 => String::from_utf8_lossy(&bytes).into_owned(),
                    };
                    let text = if zero_terminated {
                        if raw.starts_with('\0') {"\\x00".to_string()} else {raw.split('\0').next().unwrap_or("").to_string()}
                    } else {
                        raw
                    };
                    Ok(Some(text.chars().take(length).collect()))
                }
                _ => Ok(Some(crate::codec::format_value(kind, &bytes).unwrap_or_else(|| "??".to_string()))),
            }
        }
    }
}

// `x/Nxb` responses look like `0x40c431:\t0x31\t0xed\t0x49\t...`; every whitespace-delimited
// `0x..` token that isn't the leading address-with-colon is one data byte.
fn extract_value_bytes(text: &str) -> Vec<u8> {
    text.split_whitespace()
        .filter(|t| t.starts_with("0x") && !t.contains(':'))
        .filter_map(|t| u8::from_str_radix(t.trim_start_matches("0x"), 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_value_bytes_skips_address_token() {
        let text = "0x40c431:\t0x31\t0xed\t0x49\n";
        assert_eq!(extract_value_bytes(text), vec![0x31, 0xed, 0x49]);
    }

    #[test]
    fn restricted_expression_rules() {
        assert!(is_restricted_expression(""));
        assert!(is_restricted_expression("   "));
        assert!(is_restricted_expression("$pc"));
        assert!(!is_restricted_expression("\"$literal\""));
        assert!(!is_restricted_expression("{$a, $b}"));
        assert!(!is_restricted_expression("main+0x10"));
    }

    #[test]
    fn parse_probe_with_symbol() {
        let out = "0x000000000040c435 <_start+4>:\t0x89485ed1\n";
        match parse_probe(out) {
            Some(Probe::WithSymbol {address, symbol}) => {
                assert_eq!(address, "0x000000000040c435");
                assert_eq!(symbol, "_start+4");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn parse_probe_address_only() {
        let out = "0x1f58010:\t0x00647361\n";
        assert_eq!(parse_probe(out), Some(Probe::AddressOnly {address: "0x1f58010".to_string()}));
    }

    #[test]
    fn parse_probe_unreachable() {
        let out = "Cannot access memory at address 0x0\n";
        assert_eq!(parse_probe(out), Some(Probe::Unreachable));
    }

    #[test]
    fn parse_disassembly_rows() {
        let out = "Dump of assembler code from 0x40c431 to 0x40c440:\n=> 0x000000000040c431 <_start+0>:\t48 81 ec d8 00\tsub    rsp,0xd8\n0x000000000040c436 <_start+5>:\t90\tnop\n";
        let rows = parse_disassembly(out);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].address, Address(0x40c431));
        assert_eq!(rows[0].bytes, vec![0x48, 0x81, 0xec, 0xd8, 0x00]);
        assert_eq!(rows[0].mnemonic, "sub    rsp,0xd8");
        assert_eq!(rows[1].address, Address(0x40c436));
    }

    fn row(addr: u64) -> DisassemblyRow {
        DisassemblyRow {address: Address(addr), bytes: vec![0x90], mnemonic: "nop".to_string()}
    }

    #[test]
    fn pick_row_next_counts_forward_from_window_start() {
        let rows = vec![row(0x1000), row(0x1001), row(0x1002)];
        assert_eq!(pick_row(&rows, 2, Direction::Next), Some(Address(0x1002)));
    }

    #[test]
    fn pick_row_next_underflow_is_none() {
        let rows = vec![row(0x1000), row(0x1001)];
        assert_eq!(pick_row(&rows, 5, Direction::Next), None);
    }

    #[test]
    fn pick_row_previous_counts_back_from_window_end() {
        let rows = vec![row(0x1000), row(0x1001), row(0x1002)];
        assert_eq!(pick_row(&rows, 1, Direction::Previous), Some(Address(0x1002)));
        assert_eq!(pick_row(&rows, 3, Direction::Previous), Some(Address(0x1000)));
    }

    #[test]
    fn pick_row_previous_underflow_is_none() {
        let rows = vec![row(0x1000), row(0x1001)];
        assert_eq!(pick_row(&rows, 3, Direction::Previous), None);
    }
}
