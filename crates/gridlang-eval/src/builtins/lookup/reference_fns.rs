//! Functions that inspect or construct references: `ROW`, `COLUMN`,
//! `ROWS`, `COLUMNS`, `ADDRESS`, `INDIRECT`, `OFFSET`, `TRANSPOSE`.

use gridlang_common::{
    number_to_column, parse_reference, CellRef, Coord, ErrorKind, FormulaError, RangeRef,
    ReferenceKind, Value,
};

use crate::function::{ArgumentHandle, ReferenceArg};
use crate::registry::FunctionRegistry;
use crate::traits::EvaluationContext;
use crate::{builtin_fn, fns};

builtin_fn!(RowFn, "ROW", min 0, max 1, |args: &[ArgumentHandle<'_, '_>], ctx: &dyn EvaluationContext| {
    match args.first() {
        None => Ok(Value::Number(ctx.current_cell().row() as f64)),
        Some(arg) => match arg.as_reference() {
            Some(ReferenceArg::Cell(c)) => Ok(Value::Number(c.row() as f64)),
            Some(ReferenceArg::Range(r)) => Ok(Value::Number(r.start.row as f64)),
            None => Err(FormulaError::new_value().with_message("expected a reference")),
        },
    }
});

builtin_fn!(ColumnFn, "COLUMN", min 0, max 1, |args: &[ArgumentHandle<'_, '_>], ctx: &dyn EvaluationContext| {
    match args.first() {
        None => Ok(Value::Number(ctx.current_cell().col() as f64)),
        Some(arg) => match arg.as_reference() {
            Some(ReferenceArg::Cell(c)) => Ok(Value::Number(c.col() as f64)),
            Some(ReferenceArg::Range(r)) => Ok(Value::Number(r.start.col as f64)),
            None => Err(FormulaError::new_value().with_message("expected a reference")),
        },
    }
});

builtin_fn!(RowsFn, "ROWS", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    match args[0].as_reference() {
        Some(ReferenceArg::Range(r)) => Ok(Value::Number(r.rows() as f64)),
        Some(ReferenceArg::Cell(_)) => Ok(Value::Number(1.0)),
        None => Ok(Value::Number(args[0].range()?.rows() as f64)),
    }
});

builtin_fn!(ColumnsFn, "COLUMNS", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    match args[0].as_reference() {
        Some(ReferenceArg::Range(r)) => Ok(Value::Number(r.cols() as f64)),
        Some(ReferenceArg::Cell(_)) => Ok(Value::Number(1.0)),
        None => Ok(Value::Number(args[0].range()?.cols() as f64)),
    }
});

builtin_fn!(AddressFn, "ADDRESS", min 2, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let row = args[0].integer()?;
    let col = args[1].integer()?;
    let abs_num = match args.get(2) {
        Some(a) => a.integer()?,
        None => 1,
    };
    let a1_style = match args.get(3) {
        Some(a) => a.logical()?,
        None => true,
    };
    let sheet = match args.get(4) {
        Some(a) => Some(a.text()?),
        None => None,
    };

    if row < 1 || col < 1 {
        return Err(FormulaError::new_value().with_message("ADDRESS is 1-based"));
    }
    let (abs_row, abs_col) = match abs_num {
        1 => (true, true),
        2 => (true, false),
        3 => (false, true),
        4 => (false, false),
        _ => return Err(FormulaError::new_value().with_message("abs_num is 1-4")),
    };

    let body = if a1_style {
        format!(
            "{}{}{}{}",
            if abs_col { "$" } else { "" },
            number_to_column(col as u32),
            if abs_row { "$" } else { "" },
            row
        )
    } else {
        let r = if abs_row {
            format!("R{row}")
        } else {
            format!("R[{row}]")
        };
        let c = if abs_col {
            format!("C{col}")
        } else {
            format!("C[{col}]")
        };
        format!("{r}{c}")
    };

    Ok(Value::Text(match sheet {
        Some(s) => format!("{s}!{body}"),
        None => body,
    }))
});

builtin_fn!(IndirectFn, "INDIRECT", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], ctx: &dyn EvaluationContext| {
    let text = args[0].text()?;
    let a1 = match args.get(1) {
        Some(a) => a.logical()?,
        None => true,
    };
    // R1C1 addressing is not supported
    if !a1 {
        return Err(FormulaError::new_ref().with_message("R1C1 references are not supported"));
    }
    match parse_reference(&text) {
        Ok(ReferenceKind::Cell(cell)) => Ok(ctx.get_cell_value(&cell)),
        Ok(ReferenceKind::Range(range)) => Ok(ctx.get_range_values(&range)),
        Err(_) => Err(FormulaError::new_ref().with_message(format!("'{text}' is not a reference"))),
    }
});

builtin_fn!(OffsetFn, "OFFSET", min 3, max 5, |args: &[ArgumentHandle<'_, '_>], ctx: &dyn EvaluationContext| {
    let base = match args[0].as_reference() {
        Some(r) => r,
        None => return Err(FormulaError::new_value().with_message("expected a reference")),
    };
    let drow = args[1].integer()?;
    let dcol = args[2].integer()?;

    let (sheet, anchor, base_rows, base_cols) = match base {
        ReferenceArg::Cell(c) => (c.sheet.clone(), c.coord, 1u32, 1u32),
        ReferenceArg::Range(r) => (r.sheet.clone(), r.start, r.rows(), r.cols()),
    };

    let height = match args.get(3) {
        Some(a) => a.integer()?,
        None => base_rows as i64,
    };
    let width = match args.get(4) {
        Some(a) => a.integer()?,
        None => base_cols as i64,
    };
    if height < 1 || width < 1 {
        return Err(ErrorKind::Ref.into());
    }

    let top = anchor.row as i64 + drow;
    let left = anchor.col as i64 + dcol;
    if top < 1 || left < 1 {
        return Err(ErrorKind::Ref.into());
    }

    if height == 1 && width == 1 {
        let cell = CellRef {
            sheet,
            coord: Coord::new(top as u32, left as u32),
        };
        return Ok(ctx.get_cell_value(&cell));
    }
    let range = RangeRef::new(
        sheet,
        Coord::new(top as u32, left as u32),
        Coord::new((top + height - 1) as u32, (left + width - 1) as u32),
    );
    Ok(ctx.get_range_values(&range))
});

builtin_fn!(TransposeFn, "TRANSPOSE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    Ok(Value::Range(arr.transpose()))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        RowFn, ColumnFn, RowsFn, ColumnsFn, AddressFn, IndirectFn, OffsetFn, TransposeFn,
    ]);
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::{CellRef, ErrorKind, Value};

    fn sheet() -> TestSheet {
        TestSheet::new()
            .with_cell_a1("B2", Value::Number(42.0))
            .with_cell_a1("C3", Value::Number(7.0))
            .with_current_cell(CellRef::new(5, 4))
    }

    fn eval(src: &str) -> Value {
        Engine::new().evaluate_string(src, &sheet()).unwrap()
    }

    #[test]
    fn row_column_family() {
        assert_eq!(eval("=ROW(B2)"), Value::Number(2.0));
        assert_eq!(eval("=COLUMN(B2)"), Value::Number(2.0));
        assert_eq!(eval("=ROW()"), Value::Number(5.0));
        assert_eq!(eval("=COLUMN()"), Value::Number(4.0));
        assert_eq!(eval("=ROWS(A1:B3)"), Value::Number(3.0));
        assert_eq!(eval("=COLUMNS(A1:B3)"), Value::Number(2.0));
        assert_eq!(eval("=ROWS({1;2;3})"), Value::Number(3.0));
    }

    #[test]
    fn address_styles() {
        assert_eq!(eval("=ADDRESS(2,3)"), Value::Text("$C$2".into()));
        assert_eq!(eval("=ADDRESS(2,3,2)"), Value::Text("C$2".into()));
        assert_eq!(eval("=ADDRESS(2,3,3)"), Value::Text("$C2".into()));
        assert_eq!(eval("=ADDRESS(2,3,4)"), Value::Text("C2".into()));
        assert_eq!(eval("=ADDRESS(2,3,1,FALSE)"), Value::Text("R2C3".into()));
        assert_eq!(
            eval("=ADDRESS(2,3,4,TRUE,\"Data\")"),
            Value::Text("Data!C2".into())
        );
    }

    #[test]
    fn indirect() {
        assert_eq!(eval("=INDIRECT(\"B2\")"), Value::Number(42.0));
        match eval("=INDIRECT(\"B2:C3\")") {
            Value::Range(r) => assert_eq!(r.dims(), (2, 2)),
            other => panic!("expected range, got {other:?}"),
        }
        assert_eq!(
            eval("=INDIRECT(\"nope\")"),
            Value::Error(ErrorKind::Ref.into())
        );
        assert_eq!(
            eval("=INDIRECT(\"R2C2\",FALSE)"),
            Value::Error(ErrorKind::Ref.into())
        );
    }

    #[test]
    fn offset() {
        assert_eq!(eval("=OFFSET(A1,1,1)"), Value::Number(42.0));
        match eval("=OFFSET(A1,1,1,2,2)") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (2, 2));
                assert_eq!(r.get(1, 1), &Value::Number(7.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
        assert_eq!(
            eval("=OFFSET(A1,-1,0)"),
            Value::Error(ErrorKind::Ref.into())
        );
        assert_eq!(
            eval("=OFFSET(B2,0,0,0,1)"),
            Value::Error(ErrorKind::Ref.into())
        );
    }

    #[test]
    fn transpose_round_trip() {
        match eval("=TRANSPOSE({1,2,3})") {
            Value::Range(r) => assert_eq!(r.dims(), (3, 1)),
            other => panic!("expected range, got {other:?}"),
        }
        match eval("=TRANSPOSE(TRANSPOSE({1,2;3,4}))") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (2, 2));
                assert_eq!(r.get(1, 0), &Value::Number(3.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
        assert_eq!(eval("=TRANSPOSE(5)"), Value::Range(gridlang_common::RangeValue::single(Value::Number(5.0))));
    }
}
