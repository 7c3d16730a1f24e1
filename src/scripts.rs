use crate::{*, blob::*, error::*, gateway::*, model::*};
use std::collections::HashMap;

// C6: the eleven named scripted commands, each dispatched through the gateway with a
// file-backed request and a file-backed response. Script names match the eleven entry points
// they're grounded on one-to-one.

fn kind_tag(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::Byte => 0,
        ValueKind::Word => 1,
        ValueKind::DWord => 2,
        ValueKind::QWord => 3,
        ValueKind::Float => 4,
        ValueKind::Double => 5,
        ValueKind::String {encoding: StringEncoding::Ascii, zero_terminated: false} => 6,
        ValueKind::String {encoding: StringEncoding::Ascii, zero_terminated: true} => 7,
        ValueKind::String {encoding: StringEncoding::Utf8, zero_terminated: false} => 8,
        ValueKind::String {encoding: StringEncoding::Utf8, zero_terminated: true} => 9,
        ValueKind::ByteArray => 10,
    }
}

fn kind_from_tag(tag: u8) -> Result<ValueKind> {
    Ok(match tag {
        0 => ValueKind::Byte,
        1 => ValueKind::Word,
        2 => ValueKind::DWord,
        3 => ValueKind::QWord,
        4 => ValueKind::Float,
        5 => ValueKind::Double,
        6 => ValueKind::String {encoding: StringEncoding::Ascii, zero_terminated: false},
        7 => ValueKind::String {encoding: StringEncoding::Ascii, zero_terminated: true},
        8 => ValueKind::String {encoding: StringEncoding::Utf8, zero_terminated: false},
        9 => ValueKind::String {encoding: StringEncoding::Utf8, zero_terminated: true},
        10 => ValueKind::ByteArray,
        _ => return Err(Error::new(ErrorKind::Protocol, format!("unknown value kind tag {}", tag))),
    })
}

#[derive(Clone, Debug)]
pub struct ReadAddressRequest {
    pub address: String,
    pub kind: ValueKind,
    pub length: usize,
    pub unicode: bool,
    pub zero_terminated: bool,
}

fn encode_read_address(w: &mut Writer, r: &ReadAddressRequest) {
    w.write_str(&r.address);
    w.write_u8(kind_tag(r.kind));
    w.write_u64(r.length as u64);
    w.write_bool(r.unicode);
    w.write_bool(r.zero_terminated);
}

fn script_request(gw: &Gateway, name: &str, payload: Vec<u8>) -> Result<Option<Vec<u8>>> {
    let opts = CommandOptions {send_with_file: Some(payload), recv_with_file: true, ..Default::default()};
    match gw.send_command(name, opts)? {
        None => Ok(None),
        Some(resp) => Ok(resp.into_blob()),
    }
}

pub fn read_single_address(gw: &Gateway, req: &ReadAddressRequest) -> Result<Option<String>> {
    let mut w = Writer::new();
    encode_read_address(&mut w, req);
    match script_request(gw, "pince-read-single-address", w.into_bytes())? {
        None => Ok(None),
        Some(bytes) => Ok(Some(Reader::new(&bytes).read_str()?)),
    }
}

pub fn read_multiple_addresses(gw: &Gateway, reqs: &[ReadAddressRequest]) -> Result<Option<Vec<String>>> {
    let mut w = Writer::new();
    w.write_u64(reqs.len() as u64);
    for r in reqs {
        encode_read_address(&mut w, r);
    }
    match script_request(gw, "pince-read-multiple-addresses", w.into_bytes())? {
        None => Ok(None),
        Some(bytes) => {
            let mut r = Reader::new(&bytes);
            let n = r.read_u64()? as usize;
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                out.push(r.read_str()?);
            }
            Ok(Some(out))
        }
    }
}

#[derive(Clone, Debug)]
pub struct SetAddressRequest {
    pub address: String,
    pub kind: ValueKind,
    pub value: Vec<u8>,
}

pub fn set_multiple_addresses(gw: &Gateway, reqs: &[SetAddressRequest]) -> Result<Option<()>> {
    let mut w = Writer::new();
    w.write_u64(reqs.len() as u64);
    for r in reqs {
        w.write_str(&r.address);
        w.write_u8(kind_tag(r.kind));
        w.write_bytes(&r.value);
    }
    match script_request(gw, "pince-set-multiple-addresses", w.into_bytes())? {
        None => Ok(None),
        Some(_) => Ok(Some(())),
    }
}

fn decode_string_map(bytes: &[u8]) -> Result<HashMap<String, String>> {
    let mut r = Reader::new(bytes);
    let n = r.read_u64()? as usize;
    let mut out = HashMap::with_capacity(n);
    for _ in 0..n {
        let k = r.read_str()?;
        let v = r.read_str()?;
        out.insert(k, v);
    }
    Ok(out)
}

pub fn read_registers(gw: &Gateway) -> Result<Option<HashMap<String, String>>> {
    match script_request(gw, "pince-read-registers", Writer::new().into_bytes())? {
        None => Ok(None),
        Some(bytes) => Ok(Some(decode_string_map(&bytes)?)),
    }
}

pub fn read_float_registers(gw: &Gateway) -> Result<Option<HashMap<String, String>>> {
    match script_request(gw, "pince-read-float-registers", Writer::new().into_bytes())? {
        None => Ok(None),
        Some(bytes) => Ok(Some(decode_string_map(&bytes)?)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackTraceEntry {
    pub return_address: String,
    pub frame_address: String,
}

pub fn get_stacktrace_info(gw: &Gateway) -> Result<Option<Vec<StackTraceEntry>>> {
    match script_request(gw, "pince-get-stack-trace-info", Writer::new().into_bytes())? {
        None => Ok(None),
        Some(bytes) => {
            let mut r = Reader::new(&bytes);
            let n = r.read_u64()? as usize;
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                out.push(StackTraceEntry {return_address: r.read_str()?, frame_address: r.read_str()?});
            }
            Ok(Some(out))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackCell {
    pub pointer: String,
    pub hex_qword: String,
    pub int_repr: String,
    pub float_repr: String,
}

pub fn get_stack_info(gw: &Gateway) -> Result<Option<Vec<StackCell>>> {
    match script_request(gw, "pince-get-stack-info", Writer::new().into_bytes())? {
        None => Ok(None),
        Some(bytes) => {
            let mut r = Reader::new(&bytes);
            let n = r.read_u64()? as usize;
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                out.push(StackCell {
                    pointer: r.read_str()?,
                    hex_qword: r.read_str()?,
                    int_repr: r.read_str()?,
                    float_repr: r.read_str()?,
                });
            }
            Ok(Some(out))
        }
    }
}

pub fn get_stack_frame_return_addresses(gw: &Gateway) -> Result<Option<Vec<String>>> {
    match script_request(gw, "pince-get-frame-return-addresses", Writer::new().into_bytes())? {
        None => Ok(None),
        Some(bytes) => {
            let mut r = Reader::new(&bytes);
            let n = r.read_u64()? as usize;
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                out.push(r.read_str()?);
            }
            Ok(Some(out))
        }
    }
}

pub fn get_stack_frame_info(gw: &Gateway, frame_index: u32) -> Result<Option<String>> {
    let mut w = Writer::new();
    w.write_u32(frame_index);
    match script_request(gw, "pince-get-frame-info", w.into_bytes())? {
        None => Ok(None),
        Some(bytes) => Ok(Some(Reader::new(&bytes).read_str()?)),
    }
}

// One cell per requested byte; `None` is the wire encoding of "??" (unreadable). A single
// unreadable byte never taints its neighbors, so this is a flat Vec rather than an all-or-nothing
// result.
pub fn hex_dump(gw: &Gateway, address: &str, count: u32) -> Result<Option<Vec<Option<String>>>> {
    let mut w = Writer::new();
    w.write_str(address);
    w.write_u32(count);
    match script_request(gw, "pince-hex-dump", w.into_bytes())? {
        None => Ok(None),
        Some(bytes) => {
            let mut r = Reader::new(&bytes);
            let n = r.read_u64()? as usize;
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                out.push(r.read_opt_str()?);
            }
            Ok(Some(out))
        }
    }
}

pub fn parse_convenience_variables(gw: &Gateway, names: &[String]) -> Result<Option<Vec<String>>> {
    let mut w = Writer::new();
    w.write_u64(names.len() as u64);
    for name in names {
        w.write_str(name);
    }
    match script_request(gw, "pince-parse-convenience-variables", w.into_bytes())? {
        None => Ok(None),
        Some(bytes) => {
            let mut r = Reader::new(&bytes);
            let n = r.read_u64()? as usize;
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                out.push(r.read_str()?);
            }
            Ok(Some(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tag_round_trips() {
        for k in [
            ValueKind::Byte, ValueKind::Word, ValueKind::DWord, ValueKind::QWord,
            ValueKind::Float, ValueKind::Double, ValueKind::ByteArray,
            ValueKind::String {encoding: StringEncoding::Ascii, zero_terminated: false},
            ValueKind::String {encoding: StringEncoding::Utf8, zero_terminated: true},
        ] {
            assert_eq!(kind_from_tag(kind_tag(k)).unwrap(), k);
        }
    }

    #[test]
    fn read_address_request_encoding_round_trips_through_reader() {
        let req = ReadAddressRequest {
            address: "main+0x10".to_string(),
            kind: ValueKind::DWord,
            length: 0,
            unicode: false,
            zero_terminated: true,
        };
        let mut w = Writer::new();
        encode_read_address(&mut w, &req);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_str().unwrap(), "main+0x10");
        assert_eq!(kind_from_tag(r.read_u8().unwrap()).unwrap(), ValueKind::DWord);
        assert_eq!(r.read_u64().unwrap(), 0);
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn string_map_decoding() {
        let mut w = Writer::new();
        w.write_u64(2);
        w.write_str("rax").write_str("0x1");
        w.write_str("rbx").write_str("0x2");
        let map = decode_string_map(&w.into_bytes()).unwrap();
        assert_eq!(map.get("rax").map(String::as_str), Some("0x1"));
        assert_eq!(map.get("rbx").map(String::as_str), Some("0x2"));
    }

    #[test]
    fn hex_dump_cell_none_means_unreadable() {
        let mut w = Writer::new();
        w.write_u64(2);
        w.write_opt_str(Some("4a"));
        w.write_opt_str(None);
        let mut r = Reader::new(&w.into_bytes());
        assert_eq!(r.read_u64().unwrap(), 2);
        assert_eq!(r.read_opt_str().unwrap(), Some("4a".to_string()));
        assert_eq!(r.read_opt_str().unwrap(), None);
    }
}
