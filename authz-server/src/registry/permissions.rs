//! The static permission catalog.
//!
//! Permissions are compile-time constants, never created or mutated at
//! runtime. The [`PermissionRegistry`] is built once at startup and passed
//! explicitly to the components that need it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Groups permissions into categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionCategory {
    Appointment,
    Authorization,
    Content,
    Facility,
    Feedback,
    HealthDiary,
    Notification,
    Organisation,
    OTP,
    Program,
    ScreeningTool,
    SecurityQuestion,
    ServiceRequest,
    Survey,
    User,
}

impl PermissionCategory {
    pub const ALL: [PermissionCategory; 15] = [
        PermissionCategory::Appointment,
        PermissionCategory::Authorization,
        PermissionCategory::Content,
        PermissionCategory::Facility,
        PermissionCategory::Feedback,
        PermissionCategory::HealthDiary,
        PermissionCategory::Notification,
        PermissionCategory::Organisation,
        PermissionCategory::OTP,
        PermissionCategory::Program,
        PermissionCategory::ScreeningTool,
        PermissionCategory::SecurityQuestion,
        PermissionCategory::ServiceRequest,
        PermissionCategory::Survey,
        PermissionCategory::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionCategory::Appointment => "Appointment",
            PermissionCategory::Authorization => "Authorization",
            PermissionCategory::Content => "Content",
            PermissionCategory::Facility => "Facility",
            PermissionCategory::Feedback => "Feedback",
            PermissionCategory::HealthDiary => "HealthDiary",
            PermissionCategory::Notification => "Notification",
            PermissionCategory::Organisation => "Organisation",
            PermissionCategory::OTP => "OTP",
            PermissionCategory::Program => "Program",
            PermissionCategory::ScreeningTool => "ScreeningTool",
            PermissionCategory::SecurityQuestion => "SecurityQuestion",
            PermissionCategory::ServiceRequest => "ServiceRequest",
            PermissionCategory::Survey => "Survey",
            PermissionCategory::User => "User",
        }
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A category string supplied from outside the static catalog did not match
/// any known category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} is not a valid permission category")]
pub struct InvalidPermissionCategory(pub String);

impl FromStr for PermissionCategory {
    type Err = InvalidPermissionCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| InvalidPermissionCategory(s.to_string()))
    }
}

/// A single allowed capability.
///
/// `scope` is the dotted string the policy layer matches on and must be
/// unique across the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Permission {
    pub name: &'static str,
    pub description: &'static str,
    pub category: PermissionCategory,
    pub scope: &'static str,
}

const fn permission(
    name: &'static str,
    description: &'static str,
    category: PermissionCategory,
    scope: &'static str,
) -> Permission {
    Permission {
        name,
        description,
        category,
        scope,
    }
}

// Appointment permissions
const CAN_READ_CLIENT_APPOINTMENT: Permission = permission(
    "Read client appointment",
    "Can read client appointment",
    PermissionCategory::Appointment,
    "client.appointment.read",
);
const CAN_UPDATE_CLIENT_APPOINTMENT: Permission = permission(
    "Update client appointment",
    "Can update client appointment",
    PermissionCategory::Appointment,
    "client.appointment.update",
);

// Authorization permissions
const CAN_READ_SYSTEM_ROLE: Permission = permission(
    "Read system roles",
    "Can read system roles",
    PermissionCategory::Authorization,
    "role.read",
);

// Content permissions
const CAN_READ_CONTENT: Permission = permission(
    "Read content",
    "Can read content",
    PermissionCategory::Content,
    "content.read",
);

// Facility permissions
const CAN_DELETE_FACILITY: Permission = permission(
    "Delete facility",
    "Can delete facility",
    PermissionCategory::Facility,
    "facility.delete",
);
const CAN_UPDATE_FACILITY: Permission = permission(
    "Update facility",
    "Can update facility",
    PermissionCategory::Facility,
    "facility.update",
);
const CAN_READ_FACILITY: Permission = permission(
    "Read facility",
    "Can read facility",
    PermissionCategory::Facility,
    "facility.read",
);
const CAN_CREATE_PROGRAM_FACILITY: Permission = permission(
    "Create program facility",
    "Can create a facility in a program",
    PermissionCategory::Facility,
    "program.facility.create",
);

// Feedback permissions
const CAN_CREATE_FEEDBACK: Permission = permission(
    "Create feedback",
    "Can create feedback",
    PermissionCategory::Feedback,
    "feedback.create",
);

// HealthDiary permissions
const CAN_CREATE_HEALTH_DIARY: Permission = permission(
    "Create health diary",
    "Can create health diary",
    PermissionCategory::HealthDiary,
    "healthdiary.create",
);
const CAN_READ_HEALTH_DIARY: Permission = permission(
    "Read health diary",
    "Can read health diary",
    PermissionCategory::HealthDiary,
    "healthdiary.read",
);
const CAN_READ_CLIENT_HEALTH_DIARY: Permission = permission(
    "Read client health diary",
    "Can read client health diary",
    PermissionCategory::HealthDiary,
    "client.healthdiary.read",
);

// Notification permissions
const CAN_READ_NOTIFICATION: Permission = permission(
    "Read notification",
    "Can read notification",
    PermissionCategory::Notification,
    "notification.read",
);

// Organisation permissions
const CAN_READ_ORGANISATION: Permission = permission(
    "Read organisation",
    "Can read organisation",
    PermissionCategory::Organisation,
    "organisation.read",
);
const CAN_CREATE_ORGANISATION: Permission = permission(
    "Create organisation",
    "Can create organisation",
    PermissionCategory::Organisation,
    "organisation.create",
);
const CAN_DELETE_ORGANISATION: Permission = permission(
    "Delete organisation",
    "Can delete organisation",
    PermissionCategory::Organisation,
    "organisation.delete",
);

// OTP permissions
const CAN_CREATE_OTP: Permission = permission(
    "Create OTP",
    "Can create OTP",
    PermissionCategory::OTP,
    "otp.create",
);

// Program permissions
const CAN_READ_PROGRAM: Permission = permission(
    "Read program",
    "Can read program",
    PermissionCategory::Program,
    "program.read",
);
const CAN_CREATE_PROGRAM: Permission = permission(
    "Create program",
    "Can create program",
    PermissionCategory::Program,
    "program.create",
);
const CAN_UPDATE_PROGRAM: Permission = permission(
    "Update program",
    "Can update program",
    PermissionCategory::Program,
    "program.update",
);

// ScreeningTool permissions
const CAN_READ_SCREENING_TOOL: Permission = permission(
    "Read screening tool",
    "Can read screening tool",
    PermissionCategory::ScreeningTool,
    "screeningtool.read",
);
const CAN_CREATE_SCREENING_TOOL: Permission = permission(
    "Create screening tool",
    "Can create screening tool",
    PermissionCategory::ScreeningTool,
    "screeningtool.create",
);
const CAN_READ_SCREENING_TOOL_RESPONSE: Permission = permission(
    "Read screening tool response",
    "Can read screening tool response",
    PermissionCategory::ScreeningTool,
    "screeningtool.response.read",
);
const CAN_CREATE_SCREENING_TOOL_RESPONSE: Permission = permission(
    "Create screening tool response",
    "Can create screening tool response",
    PermissionCategory::ScreeningTool,
    "screeningtool.response.create",
);
const CAN_READ_SCREENING_TOOL_RESPONDENT: Permission = permission(
    "Read screening tool respondent",
    "Can read screening tool respondent",
    PermissionCategory::ScreeningTool,
    "screeningtool.respondent.read",
);

// SecurityQuestion permissions
const CAN_READ_SECURITY_QUESTION: Permission = permission(
    "Read security question",
    "Can read security question",
    PermissionCategory::SecurityQuestion,
    "securityquestion.read",
);
const CAN_CREATE_SECURITY_QUESTION: Permission = permission(
    "Create security question",
    "Can create security question",
    PermissionCategory::SecurityQuestion,
    "securityquestion.create",
);

// ServiceRequest permissions
const CAN_READ_SERVICE_REQUEST: Permission = permission(
    "Read service request",
    "Can read service request",
    PermissionCategory::ServiceRequest,
    "servicerequest.read",
);
const CAN_CREATE_SERVICE_REQUEST: Permission = permission(
    "Create service request",
    "Can create service request",
    PermissionCategory::ServiceRequest,
    "servicerequest.create",
);
const CAN_UPDATE_SERVICE_REQUEST: Permission = permission(
    "Update service request",
    "Can update service request",
    PermissionCategory::ServiceRequest,
    "servicerequest.update",
);
const CAN_UPDATE_CLIENT_SERVICE_REQUEST: Permission = permission(
    "Update client service request",
    "Can update client service request",
    PermissionCategory::ServiceRequest,
    "client.servicerequest.update",
);
const CAN_UPDATE_STAFF_SERVICE_REQUEST: Permission = permission(
    "Update staff service request",
    "Can update staff service request",
    PermissionCategory::ServiceRequest,
    "staff.servicerequest.update",
);

// Survey permissions
const CAN_READ_SURVEY: Permission = permission(
    "Read survey",
    "Can read survey",
    PermissionCategory::Survey,
    "survey.read",
);
const CAN_READ_SURVEY_RESPONDENT: Permission = permission(
    "Read survey respondent",
    "Can read survey respondent",
    PermissionCategory::Survey,
    "survey.respondent.read",
);
const CAN_READ_CLIENT_WITH_SURVEY_SERVICE_REQUEST: Permission = permission(
    "Read client with survey service request",
    "Can read client with service request from the survey",
    PermissionCategory::Survey,
    "client.servicerequest.survey.read",
);
const CAN_READ_SURVEY_RESPONSE: Permission = permission(
    "Read survey response",
    "Can read survey response",
    PermissionCategory::Survey,
    "survey.response.read",
);
const CAN_CREATE_SURVEY_LINK: Permission = permission(
    "Create survey link",
    "Can create survey link",
    PermissionCategory::Survey,
    "survey.link.create",
);

// User permissions
const CAN_READ_TERMS: Permission = permission(
    "Read terms",
    "Can read terms",
    PermissionCategory::User,
    "terms.read",
);
const CAN_READ_PIN: Permission = permission(
    "Read PIN",
    "Can read PIN",
    PermissionCategory::User,
    "pin.read",
);
const CAN_READ_CLIENT: Permission = permission(
    "Read client",
    "Can read client",
    PermissionCategory::User,
    "client.read",
);
const CAN_READ_STAFF: Permission = permission(
    "Read staff",
    "Can read staff",
    PermissionCategory::User,
    "staff.read",
);
const CAN_READ_CAREGIVER: Permission = permission(
    "Read caregiver",
    "Can read caregiver",
    PermissionCategory::User,
    "caregiver.read",
);
const CAN_READ_CLIENT_OF_CAREGIVER: Permission = permission(
    "Read clients of a caregiver",
    "Can read clients of a caregiver",
    PermissionCategory::User,
    "client.caregiver.read",
);
const CAN_READ_CAREGIVER_OF_CLIENT: Permission = permission(
    "Read caregivers of a client",
    "Can read caregivers of a client",
    PermissionCategory::User,
    "caregiver.client.read",
);
const CAN_READ_STAFF_FACILITY: Permission = permission(
    "Read staff's facility",
    "Can read staff's facility",
    PermissionCategory::User,
    "staff.facility.read",
);
const CAN_READ_CLIENT_FACILITY: Permission = permission(
    "Read client's facility",
    "Can read client's facility",
    PermissionCategory::User,
    "client.facility.read",
);
const CAN_READ_CLIENT_IDENTIFIER: Permission = permission(
    "Read client's identifier",
    "Can read client's identifier",
    PermissionCategory::User,
    "client.identifier.read",
);
const CAN_CREATE_USER: Permission = permission(
    "Create user",
    "Can create user",
    PermissionCategory::User,
    "user.create",
);
const CAN_CREATE_CLIENT: Permission = permission(
    "Create client",
    "Can create client",
    PermissionCategory::User,
    "client.create",
);
const CAN_CREATE_STAFF: Permission = permission(
    "Create staff",
    "Can create staff",
    PermissionCategory::User,
    "staff.create",
);
const CAN_CREATE_CAREGIVER: Permission = permission(
    "Create caregiver",
    "Can create caregiver",
    PermissionCategory::User,
    "caregiver.create",
);
const CAN_DELETE_USER: Permission = permission(
    "Delete user",
    "Can delete user",
    PermissionCategory::User,
    "user.delete",
);

const ALL_PERMISSIONS: &[Permission] = &[
    CAN_READ_CLIENT_APPOINTMENT,
    CAN_UPDATE_CLIENT_APPOINTMENT,
    CAN_READ_SYSTEM_ROLE,
    CAN_READ_CONTENT,
    CAN_DELETE_FACILITY,
    CAN_UPDATE_FACILITY,
    CAN_READ_FACILITY,
    CAN_CREATE_PROGRAM_FACILITY,
    CAN_CREATE_FEEDBACK,
    CAN_CREATE_HEALTH_DIARY,
    CAN_READ_HEALTH_DIARY,
    CAN_READ_CLIENT_HEALTH_DIARY,
    CAN_READ_NOTIFICATION,
    CAN_READ_ORGANISATION,
    CAN_CREATE_ORGANISATION,
    CAN_DELETE_ORGANISATION,
    CAN_CREATE_OTP,
    CAN_READ_PROGRAM,
    CAN_CREATE_PROGRAM,
    CAN_UPDATE_PROGRAM,
    CAN_READ_SCREENING_TOOL,
    CAN_CREATE_SCREENING_TOOL,
    CAN_READ_SCREENING_TOOL_RESPONSE,
    CAN_CREATE_SCREENING_TOOL_RESPONSE,
    CAN_READ_SCREENING_TOOL_RESPONDENT,
    CAN_READ_SECURITY_QUESTION,
    CAN_CREATE_SECURITY_QUESTION,
    CAN_READ_SERVICE_REQUEST,
    CAN_CREATE_SERVICE_REQUEST,
    CAN_UPDATE_SERVICE_REQUEST,
    CAN_UPDATE_CLIENT_SERVICE_REQUEST,
    CAN_UPDATE_STAFF_SERVICE_REQUEST,
    CAN_READ_SURVEY,
    CAN_READ_SURVEY_RESPONDENT,
    CAN_READ_CLIENT_WITH_SURVEY_SERVICE_REQUEST,
    CAN_READ_SURVEY_RESPONSE,
    CAN_CREATE_SURVEY_LINK,
    CAN_READ_TERMS,
    CAN_READ_PIN,
    CAN_READ_CLIENT,
    CAN_READ_STAFF,
    CAN_READ_CAREGIVER,
    CAN_READ_CLIENT_OF_CAREGIVER,
    CAN_READ_CAREGIVER_OF_CLIENT,
    CAN_READ_STAFF_FACILITY,
    CAN_READ_CLIENT_FACILITY,
    CAN_READ_CLIENT_IDENTIFIER,
    CAN_CREATE_USER,
    CAN_CREATE_CLIENT,
    CAN_CREATE_STAFF,
    CAN_CREATE_CAREGIVER,
    CAN_DELETE_USER,
];

const DEFAULT_CLIENT_PERMISSIONS: &[Permission] = &[
    CAN_READ_CLIENT_APPOINTMENT,
    CAN_UPDATE_CLIENT_APPOINTMENT,
    CAN_READ_CONTENT,
    CAN_READ_FACILITY,
    CAN_CREATE_FEEDBACK,
    CAN_CREATE_HEALTH_DIARY,
    CAN_READ_HEALTH_DIARY,
    CAN_READ_NOTIFICATION,
    CAN_READ_ORGANISATION,
    CAN_CREATE_OTP,
    CAN_READ_PROGRAM,
    CAN_READ_SCREENING_TOOL,
    CAN_CREATE_SCREENING_TOOL_RESPONSE,
    CAN_READ_SECURITY_QUESTION,
    CAN_CREATE_SECURITY_QUESTION,
    CAN_CREATE_SERVICE_REQUEST,
    CAN_READ_SURVEY,
    CAN_READ_TERMS,
    CAN_READ_PIN,
    CAN_READ_CLIENT,
    CAN_READ_CAREGIVER_OF_CLIENT,
    CAN_READ_CLIENT_FACILITY,
    CAN_CREATE_USER,
];

const DEFAULT_CAREGIVER_PERMISSIONS: &[Permission] = &[
    CAN_READ_CLIENT_APPOINTMENT,
    CAN_UPDATE_CLIENT_APPOINTMENT,
    CAN_READ_FACILITY,
    CAN_CREATE_FEEDBACK,
    CAN_READ_HEALTH_DIARY,
    CAN_READ_NOTIFICATION,
    CAN_READ_ORGANISATION,
    CAN_CREATE_OTP,
    CAN_READ_PROGRAM,
    CAN_READ_SECURITY_QUESTION,
    CAN_CREATE_SECURITY_QUESTION,
    CAN_CREATE_SERVICE_REQUEST,
    CAN_READ_TERMS,
    CAN_READ_PIN,
    CAN_READ_CLIENT,
    CAN_READ_CLIENT_OF_CAREGIVER,
    CAN_READ_CLIENT_FACILITY,
    CAN_CREATE_USER,
];

/// Immutable permission catalog, built once at process start.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    all: &'static [Permission],
    default_client: &'static [Permission],
    default_caregiver: &'static [Permission],
}

impl PermissionRegistry {
    /// The catalog shipped with the system.
    pub fn builtin() -> Self {
        Self {
            all: ALL_PERMISSIONS,
            default_client: DEFAULT_CLIENT_PERMISSIONS,
            default_caregiver: DEFAULT_CAREGIVER_PERMISSIONS,
        }
    }

    /// Every permission the system defines.
    pub fn all(&self) -> &[Permission] {
        self.all
    }

    /// The curated subset granted to new client users.
    pub fn default_client(&self) -> &[Permission] {
        self.default_client
    }

    /// The curated subset granted to new caregiver users.
    pub fn default_caregiver(&self) -> &[Permission] {
        self.default_caregiver
    }

    pub fn find_by_scope(&self, scope: &str) -> Option<&Permission> {
        self.all.iter().find(|p| p.scope == scope)
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_category_string_roundtrips() {
        for category in PermissionCategory::ALL {
            assert_eq!(category.as_str().parse::<PermissionCategory>(), Ok(category));
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = "Gardening".parse::<PermissionCategory>().unwrap_err();
        assert_eq!(err, InvalidPermissionCategory("Gardening".to_string()));
    }

    #[test]
    fn unknown_category_fails_deserialization() {
        let result: Result<PermissionCategory, _> = serde_json::from_str("\"Gardening\"");
        assert!(result.is_err());
    }

    #[test]
    fn category_deserializes_from_wire_value() {
        let category: PermissionCategory = serde_json::from_str("\"HealthDiary\"").unwrap();
        assert_eq!(category, PermissionCategory::HealthDiary);
    }

    #[test]
    fn scopes_are_unique() {
        let registry = PermissionRegistry::builtin();
        let scopes: HashSet<&str> = registry.all().iter().map(|p| p.scope).collect();
        assert_eq!(scopes.len(), registry.all().len());
    }

    #[test]
    fn default_client_permissions_are_a_subset_of_all() {
        let registry = PermissionRegistry::builtin();
        for p in registry.default_client() {
            assert!(
                registry.all().contains(p),
                "{} missing from the full catalog",
                p.scope
            );
        }
    }

    #[test]
    fn default_caregiver_permissions_are_a_subset_of_all() {
        let registry = PermissionRegistry::builtin();
        for p in registry.default_caregiver() {
            assert!(
                registry.all().contains(p),
                "{} missing from the full catalog",
                p.scope
            );
        }
    }

    #[test]
    fn find_by_scope_resolves_known_scopes() {
        let registry = PermissionRegistry::builtin();
        let p = registry.find_by_scope("client.appointment.read").unwrap();
        assert_eq!(p.category, PermissionCategory::Appointment);
        assert!(registry.find_by_scope("no.such.scope").is_none());
    }
}
