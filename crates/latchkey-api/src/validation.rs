//! Request validation for the Locket API
//!
//! Requests name their record kind twice: as a `type` string and as a
//! `type_code` enum. Older clients only send the string, newer ones may send
//! only the code. The pair is accepted when:
//! - the code is a known `TypeCode` value
//! - with `UNKNOWN`, the string is `lock` or `presence`
//! - with a known code, the string is empty or names the same kind

use latchkey_common::LatchkeyError;

use crate::grpc::{FetchAllRequest, LockRequest, Resource, TypeCode};
use crate::model::LockType;

/// Resolve a `type` / `type_code` pair to a single `LockType`
pub fn resolve_lock_type(type_str: &str, type_code: i32) -> Result<LockType, LatchkeyError> {
    let code = TypeCode::try_from(type_code).map_err(|_| LatchkeyError::InvalidType)?;

    match LockType::from_type_code(code) {
        None => type_str.parse(),
        Some(lock_type) if type_str.is_empty() || type_str == lock_type.as_str() => Ok(lock_type),
        Some(_) => Err(LatchkeyError::InvalidType),
    }
}

/// Validate the resource carried by a Lock or Release request
pub fn validate_resource(resource: &Resource) -> Result<LockType, LatchkeyError> {
    resolve_lock_type(&resource.r#type, resource.type_code)
}

/// Validate a Lock request, in the order type, ttl, owner
pub fn validate_lock_request(request: &LockRequest) -> Result<(Resource, LockType), LatchkeyError> {
    let resource = request.resource.clone().unwrap_or_default();
    let lock_type = validate_resource(&resource)?;

    if request.ttl_in_seconds <= 0 {
        return Err(LatchkeyError::InvalidTtl);
    }
    if resource.owner.is_empty() {
        return Err(LatchkeyError::InvalidOwner);
    }

    Ok((resource.normalized(lock_type), lock_type))
}

/// Validate a FetchAll request
pub fn validate_fetch_all_request(request: &FetchAllRequest) -> Result<LockType, LatchkeyError> {
    resolve_lock_type(&request.r#type, request.type_code)
}
