//! Status code registry.
//!
//! [`ErrorKind::for_status`] is a total mapping from an HTTP status code to the
//! kind of failure it represents:
//!
//! 1. an exact entry of the per-code table (every standard 3xx/4xx/5xx code,
//!    plus the common vendor extensions),
//! 2. otherwise the generic [`ErrorKind::ServerError`] for `500..=599`,
//! 3. otherwise the generic [`ErrorKind::ClientError`] for `400..=499`,
//! 4. otherwise the generic [`ErrorKind::Redirection`] for `300..=399`,
//! 5. otherwise no failure at all (`1xx`, `2xx`, out of range).

use derive_more::Display;

/// Coarse class of an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Family {
    /// `3xx` statuses.
    #[display("redirection")]
    Redirection,
    /// `4xx` statuses.
    #[display("client error")]
    ClientError,
    /// `5xx` statuses.
    #[display("server error")]
    ServerError,
    /// The body could not be decoded.
    #[display("decoding")]
    Decoding,
    /// The operation is not available on this response.
    #[display("unsupported operation")]
    UnsupportedOperation,
}

macro_rules! status_kinds {
    ($($variant:ident = $code:literal, $family:ident, $reason:literal;)+) => {
        /// Kind of a response failure.
        ///
        /// One variant per entry of the status table, the three generic family
        /// fallbacks, and the two failures not driven by the status code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        pub enum ErrorKind {
            $(
                #[doc = concat!("`", stringify!($code), " ", $reason, "`")]
                $variant,
            )+
            /// Any other `3xx` status.
            Redirection,
            /// Any other `4xx` status.
            ClientError,
            /// Any other `5xx` status.
            ServerError,
            /// The body is not valid structured data.
            Decoding,
            /// The operation is not supported by a blocking response.
            UnsupportedOperation,
        }

        impl ErrorKind {
            const fn exact(status: u16) -> Option<Self> {
                match status {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// The status code of a table entry, `None` for the generic kinds.
            #[must_use]
            pub const fn code(self) -> Option<u16> {
                match self {
                    $(Self::$variant => Some($code),)+
                    _ => None,
                }
            }

            /// The family this kind belongs to.
            #[must_use]
            pub const fn family(self) -> Family {
                match self {
                    $(Self::$variant => Family::$family,)+
                    Self::Redirection => Family::Redirection,
                    Self::ClientError => Family::ClientError,
                    Self::ServerError => Family::ServerError,
                    Self::Decoding => Family::Decoding,
                    Self::UnsupportedOperation => Family::UnsupportedOperation,
                }
            }

            /// Reason phrase of a table entry, `None` for the generic kinds.
            #[must_use]
            pub const fn reason(self) -> Option<&'static str> {
                match self {
                    $(Self::$variant => Some($reason),)+
                    _ => None,
                }
            }
        }
    };
}

status_kinds! {
    MultipleChoices = 300, Redirection, "Multiple Choices";
    MovedPermanently = 301, Redirection, "Moved Permanently";
    Found = 302, Redirection, "Found";
    SeeOther = 303, Redirection, "See Other";
    NotModified = 304, Redirection, "Not Modified";
    UseProxy = 305, Redirection, "Use Proxy";
    SwitchProxy = 306, Redirection, "Switch Proxy";
    TemporaryRedirect = 307, Redirection, "Temporary Redirect";
    PermanentRedirect = 308, Redirection, "Permanent Redirect";

    BadRequest = 400, ClientError, "Bad Request";
    Unauthorized = 401, ClientError, "Unauthorized";
    PaymentRequired = 402, ClientError, "Payment Required";
    Forbidden = 403, ClientError, "Forbidden";
    NotFound = 404, ClientError, "Not Found";
    MethodNotAllowed = 405, ClientError, "Method Not Allowed";
    NotAcceptable = 406, ClientError, "Not Acceptable";
    ProxyAuthenticationRequired = 407, ClientError, "Proxy Authentication Required";
    RequestTimeout = 408, ClientError, "Request Timeout";
    Conflict = 409, ClientError, "Conflict";
    Gone = 410, ClientError, "Gone";
    LengthRequired = 411, ClientError, "Length Required";
    PreconditionFailed = 412, ClientError, "Precondition Failed";
    PayloadTooLarge = 413, ClientError, "Payload Too Large";
    UriTooLong = 414, ClientError, "URI Too Long";
    UnsupportedMediaType = 415, ClientError, "Unsupported Media Type";
    RangeNotSatisfiable = 416, ClientError, "Range Not Satisfiable";
    ExpectationFailed = 417, ClientError, "Expectation Failed";
    ImATeapot = 418, ClientError, "I'm a teapot";
    PageExpired = 419, ClientError, "Page Expired";
    EnhanceYourCalm = 420, ClientError, "Enhance Your Calm";
    MisdirectedRequest = 421, ClientError, "Misdirected Request";
    UnprocessableEntity = 422, ClientError, "Unprocessable Entity";
    Locked = 423, ClientError, "Locked";
    FailedDependency = 424, ClientError, "Failed Dependency";
    TooEarly = 425, ClientError, "Too Early";
    UpgradeRequired = 426, ClientError, "Upgrade Required";
    PreconditionRequired = 428, ClientError, "Precondition Required";
    TooManyRequests = 429, ClientError, "Too Many Requests";
    RequestHeaderFieldsTooLargeShopify = 430, ClientError, "Request Header Fields Too Large";
    RequestHeaderFieldsTooLarge = 431, ClientError, "Request Header Fields Too Large";
    UnavailableForLegalReasons = 451, ClientError, "Unavailable For Legal Reasons";

    InternalServerError = 500, ServerError, "Internal Server Error";
    NotImplemented = 501, ServerError, "Not Implemented";
    BadGateway = 502, ServerError, "Bad Gateway";
    ServiceUnavailable = 503, ServerError, "Service Unavailable";
    GatewayTimeout = 504, ServerError, "Gateway Timeout";
    HttpVersionNotSupported = 505, ServerError, "HTTP Version Not Supported";
    VariantAlsoNegotiates = 506, ServerError, "Variant Also Negotiates";
    InsufficientStorage = 507, ServerError, "Insufficient Storage";
    LoopDetected = 508, ServerError, "Loop Detected";
    BandwidthLimitExceeded = 509, ServerError, "Bandwidth Limit Exceeded";
    NotExtended = 510, ServerError, "Not Extended";
    NetworkAuthenticationRequired = 511, ServerError, "Network Authentication Required";
    WebServerReturnedUnknownError = 520, ServerError, "Web Server Returned an Unknown Error";
    WebServerIsDown = 521, ServerError, "Web Server Is Down";
    ConnectionTimedOut = 522, ServerError, "Connection Timed Out";
    OriginIsUnreachable = 523, ServerError, "Origin Is Unreachable";
    TimeoutOccurred = 524, ServerError, "A Timeout Occurred";
    SslHandshakeFailed = 525, ServerError, "SSL Handshake Failed";
    InvalidSslCertificate = 526, ServerError, "Invalid SSL Certificate";
}

impl ErrorKind {
    /// Maps a status code to the failure it represents.
    ///
    /// Returns `None` for `1xx`, `2xx` and out-of-range codes.
    ///
    /// # Example
    ///
    /// ```
    /// use sluice_core::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::for_status(404), Some(ErrorKind::NotFound));
    /// assert_eq!(ErrorKind::for_status(599), Some(ErrorKind::ServerError));
    /// assert_eq!(ErrorKind::for_status(204), None);
    /// ```
    #[must_use]
    pub const fn for_status(status: u16) -> Option<Self> {
        if let Some(kind) = Self::exact(status) {
            return Some(kind);
        }
        match status {
            500..=599 => Some(Self::ServerError),
            400..=499 => Some(Self::ClientError),
            300..=399 => Some(Self::Redirection),
            _ => None,
        }
    }

    /// Default message for a failure of this kind raised on `status`.
    #[must_use]
    pub fn default_message(self, status: u16) -> String {
        match (self.code(), self.reason()) {
            (Some(code), Some(reason)) => format!("Server returned {code} {reason}"),
            _ => match self {
                Self::Decoding => "Unable to decode the response body".to_string(),
                Self::UnsupportedOperation => "Operation not supported".to_string(),
                _ => format!(
                    "Server returned an unexpected {status} HTTP status code ({})",
                    self.family()
                ),
            },
        }
    }

    /// Returns `true` for the `422 Unprocessable Entity` kind, whose payload
    /// also carries the `errors` of the body.
    #[must_use]
    pub const fn carries_errors(self) -> bool {
        matches!(self, Self::UnprocessableEntity)
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    const TABLE: &[u16] = &[
        300, 301, 302, 303, 304, 305, 306, 307, 308, //
        400, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413, 414, 415, 416, 417,
        418, 419, 420, 421, 422, 423, 424, 425, 426, 428, 429, 430, 431, 451, //
        500, 501, 502, 503, 504, 505, 506, 507, 508, 509, 510, 511, 520, 521, 522, 523, 524, 525,
        526,
    ];

    #[test]
    fn every_table_code_maps_to_its_own_kind() {
        let mut seen = std::collections::HashSet::new();
        for &code in TABLE {
            let kind = ErrorKind::for_status(code).expect("mapped");
            check!(kind.code() == Some(code));
            check!(seen.insert(kind), "duplicate kind for {code}");
        }
    }

    #[test]
    fn table_families_follow_code_ranges() {
        for &code in TABLE {
            let kind = ErrorKind::for_status(code).expect("mapped");
            let expected = match code {
                300..=399 => Family::Redirection,
                400..=499 => Family::ClientError,
                _ => Family::ServerError,
            };
            check!(kind.family() == expected);
        }
    }

    #[test]
    fn unmapped_codes_fall_back_to_family() {
        check!(ErrorKind::for_status(399) == Some(ErrorKind::Redirection));
        check!(ErrorKind::for_status(309) == Some(ErrorKind::Redirection));
        check!(ErrorKind::for_status(427) == Some(ErrorKind::ClientError));
        check!(ErrorKind::for_status(450) == Some(ErrorKind::ClientError));
        check!(ErrorKind::for_status(499) == Some(ErrorKind::ClientError));
        check!(ErrorKind::for_status(512) == Some(ErrorKind::ServerError));
        check!(ErrorKind::for_status(599) == Some(ErrorKind::ServerError));
    }

    #[test]
    fn informational_and_success_codes_do_not_map() {
        for code in [0, 100, 101, 199, 200, 201, 204, 299, 600, 999] {
            check!(ErrorKind::for_status(code).is_none(), "{code} mapped");
        }
    }

    #[test]
    fn default_messages() {
        check!(ErrorKind::NotFound.default_message(404) == "Server returned 404 Not Found");
        check!(
            ErrorKind::ServerError.default_message(599)
                == "Server returned an unexpected 599 HTTP status code (server error)"
        );
        check!(ErrorKind::Decoding.default_message(200) == "Unable to decode the response body");
    }

    #[test]
    fn only_unprocessable_entity_carries_errors() {
        check!(ErrorKind::UnprocessableEntity.carries_errors());
        check!(!ErrorKind::BadRequest.carries_errors());
        check!(!ErrorKind::ClientError.carries_errors());
    }

    #[test]
    fn family_display() {
        check!(Family::ClientError.to_string() == "client error");
        check!(Family::UnsupportedOperation.to_string() == "unsupported operation");
    }
}
