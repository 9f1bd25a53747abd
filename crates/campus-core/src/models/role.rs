//! Role domain model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Application role carried in the identity token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    CollegeAdmin,
    EducationDepartment,
    Teacher,
    Student,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::CollegeAdmin,
        Role::EducationDepartment,
        Role::Teacher,
        Role::Student,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::CollegeAdmin => "COLLEGE_ADMIN",
            Role::EducationDepartment => "EDUCATION_DEPARTMENT",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
        }
    }

    /// Page a signed-in user of this role lands on after login.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "/super-admin",
            Role::CollegeAdmin => "/college-admin",
            Role::EducationDepartment => "/education-department",
            Role::Teacher => "/teacher",
            Role::Student => "/student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// The set of roles an authorization rule admits.
///
/// `All` is the "ALL" wildcard: any authenticated role passes.
/// `Only` with an empty set admits nobody.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSet {
    All,
    Only(Vec<Role>),
}

impl RoleSet {
    pub fn only(roles: impl IntoIterator<Item = Role>) -> Self {
        RoleSet::Only(roles.into_iter().collect())
    }

    pub fn admits(&self, role: Role) -> bool {
        match self {
            RoleSet::All => true,
            RoleSet::Only(roles) => roles.contains(&role),
        }
    }
}
