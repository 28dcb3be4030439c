pub(crate) mod calibrate;
pub(crate) mod compare;
pub(crate) mod measure;
pub(crate) mod suite;
pub(crate) mod svg;

pub(crate) use calibrate::*;
pub(crate) use compare::*;
pub(crate) use measure::*;
pub(crate) use suite::*;
pub(crate) use svg::*;

use crate::XtaskError;
use std::str::FromStr;

fn read_text(path: &str) -> Result<String, XtaskError> {
    std::fs::read_to_string(path).map_err(|source| XtaskError::ReadFile {
        path: path.to_string(),
        source,
    })
}

/// Value following the flag at `args[*i]`, advancing `i` past it.
fn flag_value<T: FromStr>(args: &[String], i: &mut usize) -> Result<T, XtaskError> {
    let flag = &args[*i];
    *i += 1;
    let Some(raw) = args.get(*i) else {
        return Err(XtaskError::Usage);
    };
    raw.trim().parse::<T>().map_err(|_| XtaskError::InvalidValue {
        flag: flag.clone(),
        value: raw.clone(),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), XtaskError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
