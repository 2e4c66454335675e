//! Hospital doctor roster used for department recommendations.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clinic {
  /// Daily outpatient department, 9:30 AM - 4:00 PM.
  RegularOpd,
  SuperSpecialist,
}

#[derive(Debug, Clone, Copy)]
pub struct Department {
  pub name: &'static str,
  pub doctors: &'static [&'static str],
  pub clinic: Clinic,
  /// Empty for regular OPD departments.
  pub schedule: &'static str,
}

pub const OPD_HOURS: &str = "Daily 9:30 AM - 4:00 PM";

pub const ROSTER: &[Department] = &[
  Department::opd("General Medicine", &["Dr. Vivek Srivastava"]),
  Department::opd("General Surgeon", &["Dr. Rahul Sharma"]),
  Department::opd("Pediatrics", &["Dr. Shalini Mangla", "Dr. Romani Bansal"]),
  Department::opd("Obs & Gynae", &["Dr. Rooshali Kumar"]),
  Department::opd("Orthopedics", &["Dr. Rajesh Kumar Tayal"]),
  Department::opd("Eye", &["Dr. Sanjeev Sehgal"]),
  Department::opd("ENT", &["Dr. Amit Mangla"]),
  Department::opd("Dental", &["Dr. Ashima"]),
  Department::opd("Physiotherapy/Diet", &["Dr. Kamakshi", "Dr. Vijay Dhiman"]),
  Department::specialist("Urology", &["Dr. Rohit Dhadwal"], "1st Wed, 10-2"),
  Department::specialist("Pulmonology", &["Dr. Mohit Kaushal"], "2nd & 4th Wed, 11-1"),
  Department::specialist("Cardiology", &["Dr. Sudhanshu Budakoti"], "3rd Fri, 11-2"),
  Department::specialist("Neurology", &["Dr. Nishit Sawal"], "1st & 3rd Tue, 11-2"),
  Department::specialist("Neuro Surgery", &["Dr. Yogesh Jindal"], "2nd & 4th Thu, 11-2"),
  Department::specialist("Nephrology", &["Dr. Kalpesh"], "1st Wed, 10-2"),
  Department::specialist("Pediatric Surgery", &["Dr. Mahindra Dange"], "4th Tue, 10-2"),
  Department::specialist("Breast & Endocrine Surgery", &["Dr. Deepti Singh"], "2nd Tue"),
  Department::specialist("Cosmetology", &["Dr. Anil Walia"], "Every Sat, 10-2"),
];

impl Department {
  const fn opd(name: &'static str, doctors: &'static [&'static str]) -> Self {
    Self {
      name,
      doctors,
      clinic: Clinic::RegularOpd,
      schedule: "",
    }
  }

  const fn specialist(
    name: &'static str,
    doctors: &'static [&'static str],
    schedule: &'static str,
  ) -> Self {
    Self {
      name,
      doctors,
      clinic: Clinic::SuperSpecialist,
      schedule,
    }
  }

  pub fn availability(&self) -> &'static str {
    match self.clinic {
      Clinic::RegularOpd => OPD_HOURS,
      Clinic::SuperSpecialist => self.schedule,
    }
  }
}

impl std::fmt::Display for Department {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}: {}", self.name, self.doctors.join(", "))?;
    if self.clinic == Clinic::SuperSpecialist {
      write!(f, " ({})", self.schedule)?;
    }
    Ok(())
  }
}

/// Finds the roster entry whose name appears in a free-text department
/// recommendation such as "Neurology (Dr. Nishit Sawal available ...)".
/// The longest matching name wins so "Neuro Surgery" beats "Neurology".
pub fn lookup(recommendation: &str) -> Option<&'static Department> {
  let needle = recommendation.to_lowercase();
  ROSTER
    .iter()
    .filter(|d| needle.contains(&d.name.to_lowercase()))
    .max_by_key(|d| d.name.len())
}

pub fn render() -> String {
  let mut out = format!("**Regular OPD ({OPD_HOURS})**\n");
  for dept in ROSTER.iter().filter(|d| d.clinic == Clinic::RegularOpd) {
    out.push_str(&format!("- {dept}\n"));
  }
  out.push_str("\n**Super Specialists (Specific Days)**\n");
  for dept in ROSTER.iter().filter(|d| d.clinic == Clinic::SuperSpecialist) {
    out.push_str(&format!("- {dept}\n"));
  }
  out
}
