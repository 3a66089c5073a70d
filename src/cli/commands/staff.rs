use chrono::Local;
use station_domain::{parse_numeric, AccessContext, Employee};

use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "employees",
            "List staff with salary, advance, and loan balance",
            "employees",
            cmd_employees,
        ),
        CommandEntry::new(
            "add-employee",
            "Add an employee to a station with an optional monthly salary",
            "add-employee <station-id> <name> [salary]",
            cmd_add_employee,
        )
        .with_args(&[ArgKind::StationId])
        .admin_only(),
        CommandEntry::new(
            "employee-loan",
            "Lend to an employee, optionally with a monthly installment",
            "employee-loan <employee-id> <amount> [installment]",
            cmd_employee_loan,
        )
        .with_args(&[ArgKind::EmployeeId]),
        CommandEntry::new(
            "employee-repay",
            "Book a loan repayment; defaults to the monthly installment",
            "employee-repay <employee-id> [amount]",
            cmd_employee_repay,
        )
        .with_args(&[ArgKind::EmployeeId]),
    ]
}

fn visible_to(access: &AccessContext, employee: &Employee) -> bool {
    !access.is_station_bound() || employee.station_id == access.station_id
}

fn employee_mut<'a>(
    context: &'a mut ShellContext,
    raw: &str,
    usage: &str,
) -> Result<&'a mut Employee, CommandError> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidArguments(usage.into()))?;
    let access = context.access;
    let employee = context
        .dataset_mut()?
        .employee_mut(id)
        .filter(|employee| visible_to(&access, employee))
        .ok_or_else(|| CommandError::Message(format!("employee {id} not found")))?;
    Ok(employee)
}

fn cmd_employees(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let currency = context.currency().to_string();
    let access = context.access;
    let dataset = context.dataset()?;
    let directory = dataset.directory();
    let amount = |value: Option<f64>| {
        value
            .map(|value| output::money(value, &currency))
            .unwrap_or_else(|| "-".into())
    };
    let rows: Vec<Vec<String>> = dataset
        .employees
        .iter()
        .filter(|employee| visible_to(&access, employee))
        .map(|employee| {
            vec![
                employee.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                employee.name.clone(),
                employee
                    .station_id
                    .map(|id| directory.name_of(id))
                    .unwrap_or_else(|| "-".into()),
                amount(employee.monthly_salary),
                amount(employee.current_advance_amount),
                amount(employee.total_loan_amount),
                output::money(employee.remaining_loan_amount(), &currency),
                employee
                    .installments_remaining()
                    .map(|count| count.to_string())
                    .unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    if rows.is_empty() {
        output::info("No employees recorded.");
        return Ok(());
    }
    output::section("Employees");
    output::table(
        &["Id", "Name", "Station", "Salary", "Advance", "Loan", "Remaining", "Installments"],
        &rows,
    );
    Ok(())
}

fn cmd_add_employee(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "usage: add-employee <station-id> <name> [salary]";
    if args.len() < 2 {
        return Err(CommandError::InvalidArguments(USAGE.into()));
    }
    let station: i64 = args[0]
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidArguments(USAGE.into()))?;
    let (name_parts, salary) = match args[2..].last().and_then(|last| parse_numeric(last)) {
        Some(salary) if args.len() > 2 => (&args[1..args.len() - 1], Some(salary)),
        _ => (&args[1..], None),
    };
    let name = name_parts.join(" ");

    let dataset = context.dataset_mut()?;
    if !dataset.stations.iter().any(|known| known.id == station) {
        return Err(CommandError::Message(format!("station {station} not found")));
    }
    let mut employee = Employee::new(name.clone(), station);
    employee.monthly_salary = salary;
    let id = dataset.add_employee(employee)?;
    dataset.touch();
    output::success(format!("Added employee {id} `{name}` at station {station}."));
    Ok(())
}

fn cmd_employee_loan(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "usage: employee-loan <employee-id> <amount> [installment]";
    if args.len() < 2 {
        return Err(CommandError::InvalidArguments(USAGE.into()));
    }
    let amount = parse_numeric(args[1])
        .filter(|amount| *amount > 0.0)
        .ok_or_else(|| CommandError::InvalidArguments(USAGE.into()))?;
    let installment = match args.get(2) {
        Some(raw) => Some(
            parse_numeric(raw).ok_or_else(|| CommandError::InvalidArguments(USAGE.into()))?,
        ),
        None => None,
    };

    let currency = context.currency().to_string();
    let employee = employee_mut(context, args[0], USAGE)?;
    employee.total_loan_amount = Some(employee.total_loan_amount.unwrap_or(0.0) + amount);
    if installment.is_some() {
        employee.monthly_installment_amount = installment;
    }
    if employee.loan_start_date.is_none() {
        employee.loan_start_date = Some(Local::now().date_naive());
    }
    let name = employee.name.clone();
    let remaining = employee.remaining_loan_amount();
    if let Some(dataset) = context.dataset.as_mut() {
        dataset.touch();
    }
    output::success(format!(
        "Lent {} to {name}; outstanding {}.",
        output::money(amount, &currency),
        output::money(remaining, &currency)
    ));
    Ok(())
}

fn cmd_employee_repay(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "usage: employee-repay <employee-id> [amount]";
    let Some(raw) = args.first() else {
        return Err(CommandError::InvalidArguments(USAGE.into()));
    };
    let amount = match args.get(1) {
        Some(value) => Some(
            parse_numeric(value).ok_or_else(|| CommandError::InvalidArguments(USAGE.into()))?,
        ),
        None => None,
    };

    let currency = context.currency().to_string();
    let employee = employee_mut(context, raw, USAGE)?;
    if employee.remaining_loan_amount() <= 0.0 {
        return Err(CommandError::Message(format!(
            "{} has no outstanding loan",
            employee.name
        )));
    }
    if amount.is_none() && employee.monthly_installment_amount.is_none() {
        return Err(CommandError::InvalidArguments(format!(
            "{} has no monthly installment; give an amount",
            employee.name
        )));
    }
    let applied = employee.record_repayment(amount);
    if employee.remaining_loan_amount() <= 0.0 {
        employee.loan_end_date = Some(Local::now().date_naive());
    }
    let name = employee.name.clone();
    let remaining = employee.remaining_loan_amount();
    if let Some(dataset) = context.dataset.as_mut() {
        dataset.touch();
    }
    output::success(format!(
        "Booked {} from {name}; remaining {}.",
        output::money(applied, &currency),
        output::money(remaining, &currency)
    ));
    Ok(())
}
