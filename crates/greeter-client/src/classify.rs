//! Client-side classification of failed calls.
//!
//! Every error is reduced to its generic code and message first, then one
//! line per typed detail. A status whose details could not be decoded still
//! reports its code and message.

use greeter_core::{Detail, Error, Status};

/// Human-readable lines describing `status`: a header with the numeric code
/// and message, followed by one line per detail.
pub fn describe(status: &Status) -> Vec<String> {
    let mut lines = vec![format!(
        "GRPC Error : Code [{}], Message [{}]",
        status.code() as i32,
        status.message()
    )];

    for detail in status.details() {
        match detail {
            Detail::BadRequest(bad) => {
                for violation in &bad.field_violations {
                    lines.push(format!(
                        "  - Details: BadRequest: field [{}], description [{}]",
                        violation.field, violation.description
                    ));
                }
            }
            Detail::Custom(custom) => lines.push(format!(
                "  - Details: CustomError: {}, {}",
                custom.error_no, custom.description
            )),
            Detail::Other(other) => lines.push(format!(
                "  - Details: {}: {}",
                other.type_url(),
                other.describe()
            )),
            Detail::Unknown(any) => lines.push(format!(
                "  - Details: Unknown: {} ({} bytes)",
                any.type_url,
                any.value.len()
            )),
        }
    }

    lines
}

/// Logs `err`, expanding status details when the error carries a status.
pub fn report(err: &Error) {
    match err.status() {
        Some(status) => {
            for line in describe(status) {
                tracing::warn!("{}", line);
            }
        }
        None => tracing::warn!("Error: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greeter_core::proto::{BadRequest, CustomError};
    use greeter_core::{Code, DetailKind, DetailRegistry};

    #[test]
    fn header_only_without_details() {
        let lines = describe(&Status::invalid_argument("GRPC error"));
        assert_eq!(lines, ["GRPC Error : Code [3], Message [GRPC error]"]);
    }

    #[test]
    fn one_line_per_detail() {
        let status = Status::invalid_argument("GRPC error with details")
            .with_detail(BadRequest::single("Name", "bad request"))
            .with_detail(CustomError {
                error_no: -1,
                description: "custom error".to_string(),
            })
            .with_detail(prost_types_any("type.googleapis.com/acme.Mystery", 4));

        assert_eq!(
            describe(&status),
            [
                "GRPC Error : Code [3], Message [GRPC error with details]",
                "  - Details: BadRequest: field [Name], description [bad request]",
                "  - Details: CustomError: -1, custom error",
                "  - Details: Unknown: type.googleapis.com/acme.Mystery (4 bytes)",
            ]
        );
    }

    #[test]
    fn transport_error_still_reports_code() {
        let wire = tonic::Status::with_details(Code::Unknown, "EOF", vec![0xff, 0x01].into());
        let status = Status::from(wire);
        assert_eq!(describe(&status)[0], "GRPC Error : Code [2], Message [EOF]");
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct QuotaFailure {
        #[prost(string, tag = "1")]
        subject: String,
    }

    impl DetailKind for QuotaFailure {
        const TYPE_URL: &'static str = "type.googleapis.com/acme.QuotaFailure";

        fn describe(&self) -> String {
            format!("subject [{}]", self.subject)
        }
    }

    #[test]
    fn registered_extra_kind_uses_its_own_description() {
        let mut registry = DetailRegistry::with_builtins();
        registry.register::<QuotaFailure>();

        let wire: tonic::Status = Status::new(Code::ResourceExhausted, "quota")
            .with_detail(QuotaFailure {
                subject: "user:42".to_string(),
            }
            .into_detail())
            .into();
        let status = Status::from_tonic(&wire, &registry);

        assert_eq!(
            describe(&status),
            [
                "GRPC Error : Code [8], Message [quota]",
                "  - Details: type.googleapis.com/acme.QuotaFailure: subject [user:42]",
            ]
        );
    }

    fn prost_types_any(type_url: &str, len: usize) -> prost_types::Any {
        prost_types::Any {
            type_url: type_url.to_string(),
            value: vec![0; len],
        }
    }
}
