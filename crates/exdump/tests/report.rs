use luma_exdump::report::{Options, Renderer, ReportError};
use luma_exdump::{
    exception_detail, fault_status, ExceptionDetail, ExceptionDump, FaultStatus, ReadError,
    SvcBreakReason,
};
use pretty_assertions::assert_eq;

mod common;

use common::{DumpBuilder, FailingSink, FixedDisassembler, RecordingSink, NO_DISASSEMBLER};

fn kernel_panic() -> DumpBuilder {
    let mut registers: Vec<u32> = (0..13).collect();
    registers.extend_from_slice(&[
        0x0FFF_FF80, // sp
        0x0010_1234, // lr
        0x0010_2008, // pc
        0x6000_0010, // cpsr
        0x0000_0000, // dfsr
        0x0000_0002, // ifsr
        0x0000_0000, // far
        0x4000_0000, // fpexc
        0x0000_0000, // fpinst
        0x0000_0000, // fpinst2
    ]);

    DumpBuilder::new(0x0002_000B, 2)
        .registers(&registers)
        .code(&[0x00, 0x00, 0xA0, 0xE1, 0x7E, 0xFF, 0x2F, 0xE1])
        .stack(&[0x78, 0x56, 0x34, 0x12, 0x73, 0x6D, 0x00, 0x00])
        .process(b"sm\0\0\0\0\0\0", 0x0004_0130_0000_1002)
}

fn render(data: &[u8]) -> String {
    let dump = ExceptionDump::load(data).expect("failed to load dump");
    let sink = RecordingSink::default();

    Renderer::new(&NO_DISASSEMBLER, &sink)
        .render_to_string(&dump)
        .expect("failed to render report")
}

fn summary_line(report: &str, prefix: &str) -> Option<String> {
    report
        .lines()
        .find(|line| line.starts_with(prefix))
        .map(str::to_string)
}

#[test]
fn arm11_kernel_panic_report() {
    let report = render(&kernel_panic().build());

    let expected = concat!(
        "Processor: Arm11 (core 2)\n",
        "Exception type: prefetch abort (kernel panic)\n",
        "Fault status: Debug event\n",
        "Current process: sm (0004013000001002)\n",
        "\n",
        "Register dump:\n",
        "\n",
        "r0             00000000            r1             00000001            \n",
        "r2             00000002            r3             00000003            \n",
        "r4             00000004            r5             00000005            \n",
        "r6             00000006            r7             00000007            \n",
        "r8             00000008            r9             00000009            \n",
        "r10            0000000a            r11            0000000b            \n",
        "r12            0000000c            sp             0fffff80            \n",
        "lr             00101234            pc             00102008            \n",
        "\n",
        "cpsr           60000010            dfsr           00000000            \n",
        "ifsr           00000002            far            00000000            \n",
        "fpexc          40000000            fpinst         00000000            \n",
        "fpinst2        00000000            \n",
        "\n",
        "Code dump:\n",
        "\n",
        "00102004:  00 00 a0 e1 7e ff 2f e1                            |....~./.|\n",
        "\n",
        "Stack dump:\n",
        "\n",
        "0fffff80:  78 56 34 12 73 6d 00 00                            |xV4.sm..|\n",
    );

    assert_eq!(report, expected);
}

#[test]
fn arm9_minimal_report() -> anyhow::Result<()> {
    let data = DumpBuilder::new(9, 1)
        .registers(&[0x0010_0000])
        .additional(&[0xDE, 0xAD, 0xBE, 0xEF])
        .build();
    let dump = ExceptionDump::load(&data)?;

    let sink = RecordingSink::default();
    let disassembler = FixedDisassembler::new("should not be used");
    let report = Renderer::new(&disassembler, &sink).render_to_string(&dump)?;

    let expected = concat!(
        "Processor: Arm9\n",
        "Exception type: undefined instruction\n",
        "Arm9 RAM dumped to crash_arm9mem.bin, size 4\n",
        "\n",
        "Register dump:\n",
        "\n",
        "r0             00100000            \n",
        "\n",
        "Code dump:\n",
        "\n",
        "\n",
        "\n",
        "Stack dump:\n",
        "\n",
        "\n",
    );

    assert_eq!(report, expected);
    assert_eq!(*sink.saved.borrow(), [vec![0xDE, 0xAD, 0xBE, 0xEF]]);

    // An empty code dump never reaches the disassembler.
    assert!(disassembler.requests.borrow().is_empty());

    Ok(())
}

#[test]
fn svc_break_in_arm_state() -> anyhow::Result<()> {
    for (r0, reason) in [
        (0, SvcBreakReason::Panic),
        (1, SvcBreakReason::AssertionFailed),
        (2, SvcBreakReason::UserRelated),
        (3, SvcBreakReason::Other),
        (0xFFFF_FFFF, SvcBreakReason::Other),
    ] {
        let data = kernel_panic()
            .register(0, r0)
            .code(&[0x3C, 0x00, 0x00, 0xEF])
            .build();
        let dump = ExceptionDump::load(&data)?;

        assert_eq!(exception_detail(&dump), Some(ExceptionDetail::SvcBreak(reason)));
    }

    let report = render(&kernel_panic().register(0, 1).code(&[0x3C, 0x00, 0x00, 0xEF]).build());
    assert_eq!(
        summary_line(&report, "Exception type:").as_deref(),
        Some("Exception type: prefetch abort (svcBreak: assertion failed)")
    );

    Ok(())
}

#[test]
fn svc_break_in_thumb_state() -> anyhow::Result<()> {
    let thumb = kernel_panic().register(16, 0x6000_0030).register(0, 2);

    let data = thumb.clone().code(&[0x00, 0xBF, 0x3C, 0xDF]).build();
    let report = render(&data);
    assert_eq!(
        summary_line(&report, "Exception type:").as_deref(),
        Some("Exception type: prefetch abort (svcBreak: user-related)")
    );

    // The ARM encodings mean nothing in Thumb state.
    let data = thumb.clone().code(&[0x7E, 0xFF, 0x2F, 0xE1]).build();
    assert_eq!(exception_detail(&ExceptionDump::load(&data)?), None);

    // Not enough code to hold a Thumb instruction.
    let data = thumb.code(&[0x3C]).build();
    assert_eq!(exception_detail(&ExceptionDump::load(&data)?), None);

    Ok(())
}

#[test]
fn short_arm_code_has_no_detail() -> anyhow::Result<()> {
    let data = kernel_panic().code(&[0x2F, 0xE1]).build();
    assert_eq!(exception_detail(&ExceptionDump::load(&data)?), None);

    Ok(())
}

#[test]
fn vfp_exception() -> anyhow::Result<()> {
    let data = kernel_panic()
        .register(20, 0xC000_0000)
        .build();
    let mut builder = DumpBuilder::new(0x0001_000B, 1).register(20, 0xC000_0000);

    // Prefetch aborts are never classified as VFP exceptions.
    assert_eq!(
        exception_detail(&ExceptionDump::load(&data)?),
        Some(ExceptionDetail::KernelPanic)
    );

    let report = render(&builder.build());
    assert_eq!(
        summary_line(&report, "Exception type:").as_deref(),
        Some("Exception type: undefined instruction (VFP exception)")
    );

    builder.processor = 9;
    assert_eq!(exception_detail(&ExceptionDump::load(&builder.build())?), None);

    builder.processor = 0x0001_000B;
    builder.registers.truncate(20);
    assert_eq!(exception_detail(&ExceptionDump::load(&builder.build())?), None);

    Ok(())
}

#[test]
fn data_abort_access_type() {
    let write = DumpBuilder::new(0x0001_000B, 3)
        .register(17, (1 << 11) | 0b0101)
        .register(19, 0xDEAD_BEEF)
        .build();
    let report = render(&write);

    assert_eq!(
        summary_line(&report, "Fault status:").as_deref(),
        Some("Fault status: Translation - Section")
    );
    assert_eq!(
        summary_line(&report, "FAR").as_deref(),
        Some("FAR            deadbeef            Access type: Write")
    );

    let read = DumpBuilder::new(0x0001_000B, 3)
        .register(17, 0b1111)
        .register(19, 0x0800_0000)
        .build();
    let report = render(&read);

    assert_eq!(
        summary_line(&report, "Fault status:").as_deref(),
        Some("Fault status: Permission - Page")
    );
    assert_eq!(
        summary_line(&report, "FAR").as_deref(),
        Some("FAR            08000000            Access type: Read")
    );

    // The Arm9 has no MMU, so there is no fault status or access type.
    let arm9 = DumpBuilder::new(9, 3).register(17, 1 << 11).build();
    let report = render(&arm9);

    assert_eq!(summary_line(&report, "Fault status:"), None);
    assert_eq!(summary_line(&report, "FAR"), None);
}

#[test]
fn fault_status_lookup() -> anyhow::Result<()> {
    let unknown = DumpBuilder::new(11, 2).register(18, 0xF0).build();
    let report = render(&unknown);
    assert_eq!(
        summary_line(&report, "Fault status:").as_deref(),
        Some("Fault status: Unknown")
    );

    let unknown_type = DumpBuilder::new(11, 7).register(17, 0b1000).build();
    let dump = ExceptionDump::load(&unknown_type)?;
    assert_eq!(
        fault_status(&dump).and_then(|code| code.status()),
        Some(FaultStatus::PreciseExternalAbort)
    );

    let undefined = DumpBuilder::new(11, 1).register(17, 0b1000).build();
    assert_eq!(fault_status(&ExceptionDump::load(&undefined)?), None);

    let missing_register = DumpBuilder::new(11, 2).registers(&[0; 18]).build();
    assert_eq!(fault_status(&ExceptionDump::load(&missing_register)?), None);

    Ok(())
}

#[test]
fn odd_register_count_layout() {
    let data = DumpBuilder::new(11, 0)
        .registers(&[0x1111_1111; 17])
        .build();
    let report = render(&data);

    let registers: Vec<&str> = report
        .lines()
        .skip_while(|line| *line != "Register dump:")
        .skip(2)
        .take_while(|line| *line != "Code dump:")
        .collect();

    assert_eq!(
        registers,
        [
            "r0             11111111            r1             11111111            ",
            "r2             11111111            r3             11111111            ",
            "r4             11111111            r5             11111111            ",
            "r6             11111111            r7             11111111            ",
            "r8             11111111            r9             11111111            ",
            "r10            11111111            r11            11111111            ",
            "r12            11111111            sp             11111111            ",
            "lr             11111111            pc             11111111            ",
            "",
            "cpsr           11111111            ",
            "",
        ]
    );
}

#[test]
fn disassembly_replaces_hexdump() -> anyhow::Result<()> {
    let data = kernel_panic().build();
    let dump = ExceptionDump::load(&data)?;

    let sink = RecordingSink::default();
    let disassembler = FixedDisassembler::new(
        "  102004:\te1a00000 \tnop\t\t\t; (mov r0, r0)\n  102008:\te12fff7e \tbkpt\t0xfff7e\n\n",
    );
    let report = Renderer::new(&disassembler, &sink).render_to_string(&dump)?;

    assert!(report.contains(
        "Code dump:\n\n  102004:\te1a00000 \tnop\t\t\t; (mov r0, r0)\n  102008:\te12fff7e \tbkpt\t0xfff7e\n\nStack dump:"
    ));
    assert!(!report.contains("00102004:  00 00 a0 e1"));
    assert_eq!(*disassembler.requests.borrow(), [(0x0010_2004, 8, false)]);

    Ok(())
}

#[test]
fn blank_disassembly_falls_back_to_hexdump() -> anyhow::Result<()> {
    let data = kernel_panic().build();
    let dump = ExceptionDump::load(&data)?;

    let sink = RecordingSink::default();
    let disassembler = FixedDisassembler::new("  \n");
    let report = Renderer::new(&disassembler, &sink).render_to_string(&dump)?;

    assert!(report.contains("00102004:  00 00 a0 e1 7e ff 2f e1"));

    Ok(())
}

#[test]
fn sink_failure_is_not_fatal() -> anyhow::Result<()> {
    let data = DumpBuilder::new(9, 3).additional(&[0; 0x40]).build();
    let dump = ExceptionDump::load(&data)?;

    let report = Renderer::new(&NO_DISASSEMBLER, &FailingSink).render_to_string(&dump)?;

    assert_eq!(
        summary_line(&report, "Arm9 RAM").as_deref(),
        Some("Arm9 RAM (size 40) could not be saved: read-only file system")
    );
    assert!(report.contains("Stack dump:"));

    Ok(())
}

#[test]
fn non_ascii_process_name_is_fatal() -> anyhow::Result<()> {
    let data = kernel_panic()
        .process(b"\xffoops\0\0\0", 0x0004_0130_0000_1002)
        .build();
    let dump = ExceptionDump::load(&data)?;
    let sink = RecordingSink::default();

    let mut output = String::new();
    let err = Renderer::new(&NO_DISASSEMBLER, &sink)
        .render(&mut output, &dump)
        .unwrap_err();

    assert!(matches!(err, ReportError::Read(ReadError::InvalidProcessName)));

    // Everything before the process line was already written.
    assert!(output.starts_with("Processor: Arm11 (core 2)\n"));
    assert!(output.contains("Fault status: Debug event\n"));
    assert!(!output.contains("Register dump:"));

    Ok(())
}

#[test]
fn custom_hexdump_options() -> anyhow::Result<()> {
    let data = kernel_panic().build();
    let dump = ExceptionDump::load(&data)?;
    let sink = RecordingSink::default();

    let report = Renderer::new(&NO_DISASSEMBLER, &sink)
        .options(Options::new().hexdump_width(4).placeholder('_'))
        .render_to_string(&dump)?;

    assert!(report.contains("00102004:  00 00  a0 e1   |____|\n00102008:  7e ff  2f e1   |~_/_|\n"));
    assert!(report.contains("0fffff80:  78 56  34 12   |xV4_|\n0fffff84:  73 6d  00 00   |sm__|\n"));

    Ok(())
}

#[test]
fn rendering_is_deterministic() -> anyhow::Result<()> {
    let data = kernel_panic().build();
    let dump = ExceptionDump::load(&data)?;
    let sink = RecordingSink::default();
    let renderer = Renderer::new(&NO_DISASSEMBLER, &sink);

    assert_eq!(renderer.render_to_string(&dump)?, renderer.render_to_string(&dump)?);

    let data = DumpBuilder::new(9, 0).additional(&[1, 2, 3]).build();
    let dump = ExceptionDump::load(&data)?;

    assert_eq!(renderer.render_to_string(&dump)?, renderer.render_to_string(&dump)?);
    assert_eq!(sink.saved.borrow().len(), 2);

    Ok(())
}
