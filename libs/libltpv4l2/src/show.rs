//! Human-readable dumps of enumeration results, emitted as TINFO lines so a
//! failing run shows what the driver actually reported.

use libltp::tst_res;

use crate::types::{
    self, Capabilities, Capability, FmtDesc, FrmSizeEnum, Input, FRMSIZE_TYPE_CONTINUOUS,
    FRMSIZE_TYPE_DISCRETE,
};

fn cstr(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).unwrap_or("<non-utf8>")
}

pub fn capability(cap: &Capability) {
    let caps = Capabilities::from_bits_retain(cap.capabilities);
    tst_res!(
        Info,
        "driver '{}' card '{}' bus '{}' version {}.{}.{}",
        cstr(&cap.driver),
        cstr(&cap.card),
        cstr(&cap.bus_info),
        (cap.version >> 16) & 0xff,
        (cap.version >> 8) & 0xff,
        cap.version & 0xff
    );
    tst_res!(Info, "capabilities: {:?}", caps);
}

pub fn format(fmt: &FmtDesc) {
    let compressed = if fmt.flags & types::FMT_FLAG_COMPRESSED != 0 {
        " (compressed)"
    } else {
        ""
    };
    tst_res!(
        Info,
        "format {}: '{}' {}{}",
        fmt.index,
        types::fourcc(fmt.pixelformat),
        cstr(&fmt.description),
        compressed
    );
}

pub fn frame_size(frm: &FrmSizeEnum) {
    match frm.type_ {
        FRMSIZE_TYPE_DISCRETE => {
            let d = frm.discrete();
            tst_res!(Info, "size {}: {}x{}", frm.index, d.width, d.height);
        }
        t => {
            let s = frm.stepwise();
            let kind = if t == FRMSIZE_TYPE_CONTINUOUS {
                "continuous"
            } else {
                "stepwise"
            };
            tst_res!(
                Info,
                "size {}: {} {}x{} .. {}x{} step {}x{}",
                frm.index,
                kind,
                s.min_width,
                s.min_height,
                s.max_width,
                s.max_height,
                s.step_width,
                s.step_height
            );
        }
    }
}

pub fn input(input: &Input) {
    tst_res!(
        Info,
        "input {}: '{}' type {} status {:#x}",
        input.index,
        cstr(&input.name),
        input.type_,
        input.status
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cstr_stops_at_nul() {
        assert_eq!(cstr(b"uvc\0garbage"), "uvc");
        assert_eq!(cstr(b"no-nul"), "no-nul");
    }
}
