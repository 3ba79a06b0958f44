//! Raw context switch.
//!
//! Threads are switched by saving/restoring only the callee-saved registers
//! (the caller-saved set is already on the stack per the System V ABI at
//! any call site) and swapping stack pointers. The switch is itself a
//! regular function call from the scheduler's point of view: it "returns"
//! into whichever thread it switched to, which is why a freshly created
//! thread's initial stack frame (see [`new_thread_stack`]) is built to look
//! exactly like what this function expects to pop.

/// Switch from the thread whose stack pointer is at `*prev_sp` to the thread
/// whose stack pointer is `next_sp`, storing the previous thread's saved
/// pointer back into `*prev_sp` on return (when it is switched back to).
///
/// # Safety
///
/// `next_sp` must point into a valid stack previously prepared by this
/// function or by [`new_thread_stack`]. Must be called with interrupts
/// disabled; the restored thread resumes with whatever interrupt state its
/// own stack frame encodes.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_to(_prev_sp: *mut usize, _next_sp: usize) {
    core::arch::naked_asm!(
        // Save callee-saved registers (System V ABI).
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        // *prev_sp = rsp; rsp = next_sp.
        "mov [rdi], rsp",
        "mov rsp, rsi",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
    )
}

/// Build the initial stack for a new thread so that the first
/// [`switch_to`] into it "returns" into `trampoline`.
///
/// `trampoline` takes no arguments; it is expected to look up its own
/// thread's entry point and argument through [`crate::sched::scheduler::current`]
/// rather than receive them via registers, since nothing on the fabricated
/// stack below runs the usual call-site argument setup.
///
/// `stack_top` must be 16-byte aligned (it is the address one past the end
/// of the stack region). Returns the stack pointer to store as the
/// thread's saved stack pointer.
pub fn new_thread_stack(stack_top: usize, trampoline: extern "C" fn() -> !) -> usize {
    // SAFETY: `stack_top` belongs to a freshly allocated kernel stack frame
    // with no other writers; this function is the only initializer.
    unsafe {
        let mut sp = stack_top as *mut usize;

        sp = sp.sub(1);
        *sp = trampoline as usize; // return address popped by `ret` in switch_to

        // Six callee-saved registers switch_to pops on resume: r15 r14 r13
        // r12 rbx rbp. Their initial value is irrelevant since `trampoline`
        // never reads them.
        for _ in 0..6 {
            sp = sp.sub(1);
            *sp = 0;
        }

        sp as usize
    }
}
